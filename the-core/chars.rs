/// Zero width space used as a caret placeholder inside otherwise empty
/// inline content.
pub const INVISIBLE_SPACE: char = '\u{200B}';

/// Characters that take up an offset in a text node but never render.
#[inline]
pub fn char_is_invisible(ch: char) -> bool {
  matches!(
    ch,
    INVISIBLE_SPACE
      | '\u{FEFF}' // Zero Width No-break Space
      | '\u{2060}' // Word Joiner
  )
}

/// True when every char of `text` is invisible (or `text` is empty).
#[inline]
pub fn str_is_invisible(text: &str) -> bool {
  text.chars().all(char_is_invisible)
}
