//! Error types for `rollbook-core`.

use thiserror::Error;

/// The closed error taxonomy of the store facade.
///
/// Backends convert their internal failures into this type at the trait
/// boundary. `DuplicateKey` and `NotFound` are expected, recoverable
/// conditions callers branch on; `Storage` wraps any underlying engine
/// failure (corruption, quota, serialization) with the cause attached and is
/// never retried automatically.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("duplicate id {id:?} in collection {collection:?}")]
  DuplicateKey { collection: String, id: String },

  #[error("no matching record in collection {collection:?}")]
  NotFound { collection: String },

  #[error("record has no string `id` field")]
  MissingId,

  #[error("record ids are immutable; patch would change id {id:?}")]
  IdImmutable { id: String },

  #[error("storage engine failure: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
  /// Wrap an arbitrary engine failure as [`StoreError::Storage`].
  pub fn storage(
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
  ) -> Self {
    Self::Storage(source.into())
  }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
