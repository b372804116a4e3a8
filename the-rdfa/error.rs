use the_model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatastoreError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatastoreError {
  #[error("no prefix {prefix:?} is configured")]
  UnknownPrefix { prefix: String },
  #[error("{term:?} is not a valid term")]
  InvalidTerm { term: String },
  #[error("invalid datastore config: {0}")]
  Config(#[from] toml::de::Error),
  #[error(transparent)]
  Model(#[from] ModelError),
}
