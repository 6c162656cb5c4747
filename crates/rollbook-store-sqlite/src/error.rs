//! Error type for `rollbook-store-sqlite`.

use rollbook_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A facade-level condition (duplicate key, missing id, immutable id).
  #[error("store error: {0}")]
  Store(#[from] StoreError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("record body is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),
}

/// Collapse into the closed taxonomy the facade exposes to callers.
impl From<Error> for StoreError {
  fn from(error: Error) -> Self {
    match error {
      Error::Store(inner) => inner,
      Error::Database(inner) => StoreError::storage(inner),
      Error::Json(inner) => StoreError::storage(inner),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
