use thiserror::Error;

/// Errors raised while encoding a workflow. Any of them aborts generation.
#[derive(Debug, Error)]
pub enum GenerateError {
  /// A task or map refers to a function missing from the resource map.
  #[error("state '{state}' refers to function '{func_name}' which has no deployed resource")]
  UnresolvedFunction { state: String, func_name: String },

  /// A successor or case target names a state that does not exist.
  #[error("state '{state}' refers to unknown state '{target}'")]
  DanglingReference { state: String, target: String },

  /// Parallel states take exactly two branches.
  #[error("parallel state '{state}' has {found} branches, expected 2")]
  BranchCount { state: String, found: usize },

  /// A branch could not be wrapped as a single-state pipeline.
  #[error("branch '{branch}' of parallel state '{state}' cannot be used as a branch")]
  InvalidBranch { state: String, branch: String },

  /// Switch literals must be numbers or strings.
  #[error("switch state '{state}' compares against unsupported literal {value}")]
  UnsupportedLiteral {
    state: String,
    value: serde_json::Value,
  },

  /// Two fragments share a name within one scope.
  #[error("duplicate state name in generated document: {0}")]
  DuplicateState(String),

  #[error("failed to serialize document: {0}")]
  Export(#[from] serde_json::Error),
}
