//! [`Record`] — the schema-less unit of storage.
//!
//! A record is a flat JSON object with a required string `id`, unique within
//! its collection and immutable after creation. The store enforces nothing
//! else: foreign-key-like fields are plain string ids with no referential
//! integrity, and cross-collection consistency is the caller's problem.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// A shallow-merge patch applied by `update`. Keys overwrite the matching
/// record fields; the `id` key is ignored unless it would change the id, in
/// which case the update fails.
pub type Patch = Map<String, Value>;

/// A flat key-value record with a required string `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
  pub fn new(fields: Map<String, Value>) -> Self {
    Self(fields)
  }

  /// Build a record from a JSON value. Returns `None` if the value is not an
  /// object; the `id` requirement is enforced later, at insert time.
  pub fn from_value(value: Value) -> Option<Self> {
    match value {
      Value::Object(fields) => Some(Self(fields)),
      _ => None,
    }
  }

  /// Serialize any struct that maps to a flat JSON object into a record.
  pub fn from_serialize<T: Serialize>(value: &T) -> serde_json::Result<Self> {
    match serde_json::to_value(value)? {
      Value::Object(fields) => Ok(Self(fields)),
      other => Err(serde::ser::Error::custom(format!(
        "record must serialize to a JSON object, got {other}"
      ))),
    }
  }

  /// Deserialize the record back into a typed struct.
  pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(self.0.clone()))
  }

  /// The record's `id` field, or [`StoreError::MissingId`] if absent or not
  /// a string.
  pub fn id(&self) -> Result<&str> {
    self
      .0
      .get("id")
      .and_then(Value::as_str)
      .ok_or(StoreError::MissingId)
  }

  pub fn get(&self, field: &str) -> Option<&Value> {
    self.0.get(field)
  }

  pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(field.into(), value.into());
  }

  /// Shallow-merge `patch` into this record.
  ///
  /// An `id` key in the patch is accepted only if it equals the current id;
  /// anything else is [`StoreError::IdImmutable`].
  pub fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
    if let Some(new_id) = patch.get("id")
      && self.0.get("id") != Some(new_id)
    {
      return Err(StoreError::IdImmutable {
        id: self.id().unwrap_or_default().to_owned(),
      });
    }

    for (field, value) in patch {
      if field == "id" {
        continue;
      }
      self.0.insert(field.clone(), value.clone());
    }
    Ok(())
  }

  pub fn fields(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn into_fields(self) -> Map<String, Value> {
    self.0
  }
}
