//! Error type for `rollbook-activation`.

use rollbook_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The key itself was rejected; the inner kind says why (malformed,
  /// tampered, wrong subject, expired, …).
  #[error("license key rejected: {0}")]
  Key(#[from] rollbook_license::Error),

  /// The key is valid but its id already appears in the activation history.
  #[error("license key has already been used")]
  KeyAlreadyUsed,

  #[error("store error: {0}")]
  Store(#[from] StoreError),

  /// A stored subscription or history record does not have the expected
  /// shape.
  #[error("stored record is malformed: {0}")]
  MalformedRecord(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
