//! Error types for the rollbook-license codec.
//!
//! Every validation failure is one of a closed set of kinds so the
//! activation dialog can branch on them; all messages are suitable for
//! showing to the user, and none is fatal — the user is invited to re-enter
//! or request a new key.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The key could not be decoded back to a `checksum:payload` string.
  #[error("key is not in a recognisable format: {0}")]
  Malformed(String),

  /// The embedded checksum does not match the payload.
  #[error("key failed its integrity check")]
  Tampered,

  /// Decoding succeeded but the payload is structurally invalid.
  #[error("key payload is corrupt: {0}")]
  CorruptPayload(String),

  #[error("key was issued for subject {found:?}, not {expected:?}")]
  SubjectMismatch { expected: String, found: String },

  /// The validity window ended before the current moment (end-of-day
  /// inclusive).
  #[error("key expired at the end of {0}")]
  Expired(NaiveDate),

  #[error("failed to serialise key payload: {0}")]
  Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
