use thiserror::Error;

use crate::{
  position::Path,
  tree::NodeId,
};

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
  #[error("range end {end:?} lies before its start {start:?}")]
  MisbehavedRange { start: Path, end: Path },
  #[error("selection has {ranges} ranges, expected exactly one")]
  MisbehavedSelection { ranges: usize },
  #[error("no mark registered under the name {name:?}")]
  UnrecognizedMark { name: String },
  #[error("no inline component registered under the name {name:?}")]
  UnrecognizedComponent { name: String },
  #[error("path {path:?} does not address a point in this tree")]
  InvalidPosition { path: Path },
  #[error("{0}")]
  Model(String),
  #[error("illegal execution state: {0}")]
  IllegalExecutionState(String),
  #[error("type assertion failed for node {node:?}: {message}")]
  TypeAssertion { node: NodeId, message: String },
  #[error("not implemented: {0}")]
  NotImplemented(&'static str),
  #[error("transaction was aborted by a failed step and cannot be committed")]
  AbortedTransaction,
}

impl ModelError {
  pub(crate) fn illegal(message: impl Into<String>) -> Self {
    Self::IllegalExecutionState(message.into())
  }

  pub(crate) fn model(message: impl Into<String>) -> Self {
    Self::Model(message.into())
  }

  pub(crate) fn type_assertion(node: NodeId, message: impl Into<String>) -> Self {
    Self::TypeAssertion {
      node,
      message: message.into(),
    }
  }
}
