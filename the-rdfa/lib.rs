//! RDFa quads asserted by a document tree.
//!
//! [`Datastore::from_parse`] runs the RDFa processor over a
//! [`the_model::tree::Tree`] and indexes which nodes assert which subjects,
//! predicates and objects. Queries narrow the dataset without touching the
//! node tables.

pub mod config;
pub mod datastore;
pub mod error;
pub mod parse;
pub mod term;

pub use config::DatastoreConfig;
pub use datastore::{
  Datastore,
  QuadResult,
};
pub use error::{
  DatastoreError,
  Result,
};
pub use term::{
  Literal,
  Quad,
  Term,
  TermPattern,
};
