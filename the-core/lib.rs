//! Text primitives shared by the document model.
//!
//! Everything here works on plain `&str` and addresses text by *char* index,
//! which is the unit the document model uses for text offsets.

pub mod chars;
pub mod grapheme;
