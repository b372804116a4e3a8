//! Char and grapheme helpers for plain text addressed by char index.

use unicode_segmentation::UnicodeSegmentation;

use crate::chars::str_is_invisible;

/// Number of chars in `text`. Text offsets in the document model are counted
/// in chars.
#[inline]
pub fn len_chars(text: &str) -> usize {
  text.chars().count()
}

/// Byte index of the `char_idx`th char, or `text.len()` past the end.
#[inline]
pub fn char_to_byte(text: &str, char_idx: usize) -> usize {
  text
    .char_indices()
    .nth(char_idx)
    .map_or(text.len(), |(byte, _)| byte)
}

/// Char spans `(start, end)` of the grapheme clusters of `text` that render
/// something. Clusters made only of invisible placeholder chars are skipped.
pub fn visible_graphemes(text: &str) -> Vec<(usize, usize)> {
  let mut spans = Vec::new();
  let mut start = 0;
  for grapheme in text.graphemes(true) {
    let end = start + len_chars(grapheme);
    if !str_is_invisible(grapheme) {
      spans.push((start, end));
    }
    start = end;
  }
  spans
}
