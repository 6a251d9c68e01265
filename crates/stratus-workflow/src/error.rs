use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionError {
  #[error("state '{state}' has an unrecognized type")]
  UnknownStateType { state: String },

  #[error("root state '{root}' does not exist")]
  MissingRoot { root: String },

  #[error("duplicate state name: {0}")]
  DuplicateState(String),

  #[error("invalid state '{state}': {message}")]
  InvalidState { state: String, message: String },

  #[error("invalid definition document: {0}")]
  InvalidDocument(#[from] serde_json::Error),
}
