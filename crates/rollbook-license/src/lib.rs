//! Offline activation-key codec for Rollbook.
//!
//! Turns a (subject id, validity window) tuple into a human-transcribable
//! key and reverses the process with tamper detection. Pure synchronous; no
//! store or I/O dependencies. Replay prevention is explicitly *not* handled
//! here — the codec is stateless, and the consuming component must check the
//! key id against its activation history (see `rollbook-activation`).
//!
//! The pipeline is deliberately weak: a non-keyed rolling hash plus
//! reversible obfuscation, both reproducible from any shipped build. It
//! deters casual tampering and catches transcription mistakes; it is not a
//! security boundary. Were compatibility with issued keys ever off the
//! table, the right upgrade is a keyed MAC with server-side validation.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
//! let key = rollbook_license::generate("SCHOOL-42", start, end).unwrap();
//! let payload = rollbook_license::validate(&key, "SCHOOL-42").unwrap();
//! assert_eq!(payload.end_date, end);
//! ```

mod checksum;

pub mod error;

use base32::Alphabet;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checksum::checksum;
pub use error::{Error, Result};

/// RFC 4648 without padding: the alphabet is uppercase alphanumeric, which
/// is what lets keys survive the strip-dashes-and-upper-case normalisation
/// on entry.
const ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };

/// Size of the dash-separated chunks in the textual form.
const GROUP: usize = 4;

// ─── Payload ─────────────────────────────────────────────────────────────────

/// What a key carries. Field order is the canonical serialisation order;
/// do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
  pub subject_id:    String,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  /// Fresh per `generate` call; what the activation history is keyed by.
  pub unique_key_id: String,
}

/// Microsecond timestamp plus a random suffix — practically unique across
/// generations, not cryptographically so.
fn fresh_key_id() -> String {
  let micros = Utc::now().timestamp_micros();
  let suffix = Uuid::new_v4().simple().to_string();
  format!("{micros}-{}", &suffix[..8])
}

// ─── Encoding ────────────────────────────────────────────────────────────────

/// Generate a new activation key for `subject_id`, valid from `start` to
/// `end` (end-of-day inclusive).
pub fn generate(subject_id: &str, start: NaiveDate, end: NaiveDate) -> Result<String> {
  let payload = Payload {
    subject_id:    subject_id.to_owned(),
    start_date:    start,
    end_date:      end,
    unique_key_id: fresh_key_id(),
  };
  encode(&payload)
}

/// Encode an already-built payload. Split out so tests can fix the key id.
pub fn encode(payload: &Payload) -> Result<String> {
  let serialized = serde_json::to_string(payload)?;
  let plaintext = format!("{}:{serialized}", checksum(&serialized));

  // Obfuscation, not encryption: base32 the UTF-8 bytes, then reverse the
  // character sequence.
  let obfuscated: String = base32::encode(ALPHABET, plaintext.as_bytes())
    .chars()
    .rev()
    .collect();

  Ok(group_for_transcription(&obfuscated))
}

fn group_for_transcription(s: &str) -> String {
  let chars: Vec<char> = s.chars().collect();
  chars
    .chunks(GROUP)
    .map(|chunk| chunk.iter().collect::<String>())
    .collect::<Vec<_>>()
    .join("-")
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Validate `key` against `expected_subject` as of now.
pub fn validate(key: &str, expected_subject: &str) -> Result<Payload> {
  validate_at(key, expected_subject, Utc::now())
}

/// Validate `key` against `expected_subject` as of `now`.
///
/// On success the full payload is returned; the caller is responsible for
/// checking `unique_key_id` against its activation history before acting.
pub fn validate_at(
  key: &str,
  expected_subject: &str,
  now: DateTime<Utc>,
) -> Result<Payload> {
  // Normalise: dashes and whitespace are formatting, case is forgiven.
  let compact: String = key
    .chars()
    .filter(|c| !c.is_whitespace() && *c != '-')
    .collect::<String>()
    .to_uppercase();

  let reversed: String = compact.chars().rev().collect();

  let bytes = base32::decode(ALPHABET, &reversed)
    .ok_or_else(|| Error::Malformed("not a valid key encoding".to_owned()))?;

  // Only canonical encodings are accepted; trailing-bit noise in the final
  // character would otherwise decode to the same bytes and mask a flipped
  // character.
  if base32::encode(ALPHABET, &bytes) != reversed {
    return Err(Error::Malformed("non-canonical key encoding".to_owned()));
  }

  let plaintext = String::from_utf8(bytes)
    .map_err(|_| Error::Malformed("decoded key is not text".to_owned()))?;

  // The checksum alphabet has no ':', so the first one is the separator.
  let (embedded, serialized) = plaintext
    .split_once(':')
    .ok_or_else(|| Error::Malformed("missing checksum separator".to_owned()))?;

  // Exact, case-sensitive match.
  if checksum(serialized) != embedded {
    return Err(Error::Tampered);
  }

  let payload: Payload = serde_json::from_str(serialized)
    .map_err(|e| Error::CorruptPayload(e.to_string()))?;

  if payload.subject_id != expected_subject {
    return Err(Error::SubjectMismatch {
      expected: expected_subject.to_owned(),
      found:    payload.subject_id,
    });
  }

  // End-of-day inclusive: the key is live through the whole end date.
  if now.date_naive() > payload.end_date {
    return Err(Error::Expired(payload.end_date));
  }

  Ok(payload)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
