//! Structured rich-text document model.
//!
//! The document is a tree of [`node::Node`]s stored in a [`tree::Tree`] arena.
//! Points in the tree are addressed with [`position::Position`]s (paths of
//! child offsets) and spans with [`range::Range`]s. Every edit is an
//! [`operation::Operation`] that mutates the tree in place and reports a
//! [`mapper::RangeMapper`] describing how positions captured before the edit
//! translate to the tree after it. The [`mutator::Mutator`] sequences
//! operations into compound edits, and a [`transaction::Transaction`] threads
//! them against a private copy of a [`state::State`] until it is committed.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod commands;
pub mod config;
pub mod error;
pub mod inline_component;
pub mod mapper;
pub mod marks;
pub mod mutator;
pub mod node;
pub mod operation;
pub mod position;
pub mod range;
pub mod rdfa;
pub mod selection;
pub mod state;
pub mod transaction;
pub mod tree;

pub type Tendril = SmartString<LazyCompact>;

pub use error::{
  ModelError,
  Result,
};
