//! [`MemoryStore`] — the in-memory backend.
//!
//! Holds every collection in a mutex-guarded map. Used as the test double
//! for crates that only need facade semantics, and as the executable
//! reference for what the persistent backend must do.

use std::{
  collections::{HashMap, HashSet},
  sync::{Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;

use crate::{
  error::{Result, StoreError},
  query::{self, Filter, Query},
  record::{Patch, Record},
  store::RecordStore,
};

#[derive(Default)]
pub struct MemoryStore {
  collections: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Record>>> {
    // A poisoned lock means a panic elsewhere already aborted the operation
    // that held it; the map itself is still structurally valid.
    self
      .collections
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }
}

impl RecordStore for MemoryStore {
  type Error = StoreError;

  async fn fetch(&self, query: &Query) -> Result<Vec<Record>> {
    let records = self
      .lock()
      .get(&query.collection)
      .cloned()
      .unwrap_or_default();
    Ok(query::evaluate(records, query))
  }

  async fn insert(
    &self,
    collection: &str,
    records: Vec<Record>,
  ) -> Result<Vec<Record>> {
    let mut guard = self.lock();
    let existing = guard.entry(collection.to_owned()).or_default();

    let mut batch_ids = HashSet::new();
    for record in &records {
      let id = record.id()?;
      let collides = !batch_ids.insert(id.to_owned())
        || existing.iter().any(|e| e.id().ok() == Some(id));
      if collides {
        return Err(StoreError::DuplicateKey {
          collection: collection.to_owned(),
          id:         id.to_owned(),
        });
      }
    }

    existing.extend(records.iter().cloned());
    Ok(records)
  }

  async fn update(
    &self,
    collection: &str,
    field: &str,
    value: &Value,
    patch: &Patch,
  ) -> Result<usize> {
    let filter = Filter {
      field: field.to_owned(),
      value: value.clone(),
    };

    let mut guard = self.lock();
    let Some(records) = guard.get_mut(collection) else {
      return Ok(0);
    };

    // Patch clones first so a rejected patch (e.g. an id change) leaves
    // nothing half-written; the call is atomic, like the sqlite backend.
    let mut patched = Vec::new();
    for (index, record) in records.iter().enumerate() {
      if query::matches(record, &filter) {
        let mut updated = record.clone();
        updated.apply_patch(patch)?;
        patched.push((index, updated));
      }
    }

    let count = patched.len();
    for (index, updated) in patched {
      records[index] = updated;
    }
    Ok(count)
  }

  async fn delete(
    &self,
    collection: &str,
    field: &str,
    value: &Value,
  ) -> Result<usize> {
    let filter = Filter {
      field: field.to_owned(),
      value: value.clone(),
    };

    let mut guard = self.lock();
    let Some(records) = guard.get_mut(collection) else {
      return Ok(0);
    };

    let before = records.len();
    records.retain(|r| !query::matches(r, &filter));
    Ok(before - records.len())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::store::RecordStoreExt as _;

  fn rec(value: serde_json::Value) -> Record {
    Record::from_value(value).unwrap()
  }

  #[tokio::test]
  async fn insert_then_filter_first() {
    let store = MemoryStore::new();
    store
      .collection("students")
      .insert(vec![
        rec(json!({"id": "s1", "name": "Avi"})),
        rec(json!({"id": "s2", "name": "Noa"})),
      ])
      .await
      .unwrap();

    let found = store
      .collection("students")
      .filter_equals("id", "s2")
      .first()
      .await
      .unwrap();
    assert_eq!(found.get("name"), Some(&json!("Noa")));
  }

  #[tokio::test]
  async fn duplicate_id_in_batch_writes_nothing() {
    let store = MemoryStore::new();
    let err = store
      .collection("groups")
      .insert(vec![
        rec(json!({"id": "g1", "name": "A"})),
        rec(json!({"id": "g1", "name": "B"})),
      ])
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));

    let all = store.collection("groups").fetch().await.unwrap();
    assert!(all.is_empty());
  }

  #[tokio::test]
  async fn update_zero_matches_is_ok() {
    let store = MemoryStore::new();
    let patch = rec(json!({"name": "x"})).into_fields();
    let n = store
      .collection("students")
      .update("id", "missing", patch)
      .await
      .unwrap();
    assert_eq!(n, 0);
  }

  #[tokio::test]
  async fn rejected_patch_leaves_no_match_modified() {
    let store = MemoryStore::new();
    store
      .collection("students")
      .insert(vec![
        rec(json!({"id": "a", "group_id": "g1", "name": "old-a"})),
        rec(json!({"id": "b", "group_id": "g1", "name": "old-b"})),
      ])
      .await
      .unwrap();

    // The patch's id collides with record "b", so the whole call must fail
    // without touching record "a" either.
    let patch = rec(json!({"id": "a", "name": "new"})).into_fields();
    let err = store
      .collection("students")
      .update("group_id", "g1", patch)
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::IdImmutable { .. }));

    for (id, name) in [("a", "old-a"), ("b", "old-b")] {
      let kept = store
        .collection("students")
        .filter_equals("id", id)
        .first()
        .await
        .unwrap();
      assert_eq!(kept.get("name"), Some(&json!(name)));
    }
  }

  #[tokio::test]
  async fn first_on_empty_is_not_found() {
    let store = MemoryStore::new();
    let err = store
      .collection("teachers")
      .filter_equals("id", "t1")
      .first()
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let none = store
      .collection("teachers")
      .filter_equals("id", "t1")
      .maybe_first()
      .await
      .unwrap();
    assert!(none.is_none());
  }
}
