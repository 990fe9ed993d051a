//! Structured error types for the lookup engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("schema: {origin}: {field}: {reason}")]
  Schema {
    origin: String,
    field: String,
    reason: String,
  },

  #[error("duplicate canon id: {0}")]
  DuplicateId(String),

  #[error("not found: {id}")]
  NotFound { id: String, suggestions: Vec<String> },

  #[error("unknown domain: {0}")]
  UnknownDomain(String),

  #[error("batch too large: {len} items (max {max})")]
  BatchTooLarge { len: usize, max: usize },

  #[error("empty query")]
  EmptyQuery,

  #[error("io: {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn schema(origin: &str, field: &str, reason: &str) -> Self {
    Self::Schema {
      origin: origin.to_string(),
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  /// Corpus integrity failures. The engine cannot serve without a usable
  /// corpus, so these abort initialization; everything else is a per-query
  /// outcome.
  pub fn is_load_failure(&self) -> bool {
    matches!(
      self,
      Self::Schema { .. } | Self::DuplicateId(_) | Self::Io { .. }
    )
  }
}
