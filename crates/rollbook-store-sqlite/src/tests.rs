//! Integration tests for `SqliteStore` against an in-memory database.

use rollbook_core::{Record, RecordStoreExt as _, StoreError, collections};
use serde_json::json;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn rec(value: serde_json::Value) -> Record {
  Record::from_value(value).expect("record literal")
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn idempotent_reads() {
  let s = store().await;
  s.collection(collections::STUDENTS)
    .insert(vec![rec(json!({"id": "X", "name": "A"}))])
    .await
    .unwrap();

  let first = s
    .collection(collections::STUDENTS)
    .filter_equals("id", "X")
    .first()
    .await
    .unwrap();
  let second = s
    .collection(collections::STUDENTS)
    .filter_equals("id", "X")
    .first()
    .await
    .unwrap();
  assert_eq!(first, second);
  assert_eq!(first.get("name"), Some(&json!("A")));
}

#[tokio::test]
async fn filter_equals_on_plain_field() {
  let s = store().await;
  s.collection(collections::STUDENTS)
    .insert(vec![
      rec(json!({"id": "1", "group_id": "g1", "name": "Avi"})),
      rec(json!({"id": "2", "group_id": "g2", "name": "Noa"})),
      rec(json!({"id": "3", "group_id": "g1", "name": "Dana"})),
    ])
    .await
    .unwrap();

  let in_group = s
    .collection(collections::STUDENTS)
    .filter_equals("group_id", "g1")
    .fetch()
    .await
    .unwrap();
  assert_eq!(in_group.len(), 2);
  assert!(in_group.iter().all(|r| r.get("group_id") == Some(&json!("g1"))));
}

#[tokio::test]
async fn order_by_sorts_and_puts_missing_last() {
  let s = store().await;
  s.collection(collections::GROUPS)
    .insert(vec![
      rec(json!({"id": "g3"})),
      rec(json!({"id": "g1", "display_order": 2})),
      rec(json!({"id": "g2", "display_order": 1})),
    ])
    .await
    .unwrap();

  let ordered = s
    .collection(collections::GROUPS)
    .order_by("display_order")
    .fetch()
    .await
    .unwrap();
  let ids: Vec<_> = ordered.iter().map(|r| r.id().unwrap().to_owned()).collect();
  assert_eq!(ids, ["g2", "g1", "g3"]);
}

#[tokio::test]
async fn select_projection_may_be_ignored() {
  let s = store().await;
  s.collection(collections::TEACHERS)
    .insert(vec![rec(json!({"id": "t1", "name": "Rivka", "phone": "05x"}))])
    .await
    .unwrap();

  // The backend returns full records regardless of the declared projection.
  let r = s
    .collection(collections::TEACHERS)
    .select(["name"])
    .filter_equals("id", "t1")
    .first()
    .await
    .unwrap();
  assert_eq!(r.get("phone"), Some(&json!("05x")));
}

#[tokio::test]
async fn first_vs_maybe_first_on_no_match() {
  let s = store().await;

  let err = s
    .collection(collections::VISITS)
    .filter_equals("id", "nope")
    .first()
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::NotFound { .. }));

  let none = s
    .collection(collections::VISITS)
    .filter_equals("id", "nope")
    .maybe_first()
    .await
    .unwrap();
  assert!(none.is_none());
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_insert_rejected_and_original_unchanged() {
  let s = store().await;
  s.collection(collections::STUDENTS)
    .insert(vec![rec(json!({"id": "s1", "name": "original"}))])
    .await
    .unwrap();

  let err = s
    .collection(collections::STUDENTS)
    .insert(vec![rec(json!({"id": "s1", "name": "imposter"}))])
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::DuplicateKey { ref id, .. } if id == "s1"));

  let kept = s
    .collection(collections::STUDENTS)
    .filter_equals("id", "s1")
    .first()
    .await
    .unwrap();
  assert_eq!(kept.get("name"), Some(&json!("original")));
}

#[tokio::test]
async fn batch_with_one_duplicate_writes_nothing() {
  let s = store().await;
  s.collection(collections::STUDENTS)
    .insert(vec![rec(json!({"id": "s1"}))])
    .await
    .unwrap();

  let err = s
    .collection(collections::STUDENTS)
    .insert(vec![
      rec(json!({"id": "s2"})),
      rec(json!({"id": "s1"})),
      rec(json!({"id": "s3"})),
    ])
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::DuplicateKey { .. }));

  let all = s.collection(collections::STUDENTS).fetch().await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn insert_without_id_is_rejected() {
  let s = store().await;
  let err = s
    .collection(collections::STUDENTS)
    .insert(vec![rec(json!({"name": "no id"}))])
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::MissingId));
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_patches_every_match_and_reports_count() {
  let s = store().await;
  s.collection(collections::STUDENTS)
    .insert(vec![
      rec(json!({"id": "1", "group_id": "g1", "flagged": false})),
      rec(json!({"id": "2", "group_id": "g1", "flagged": false})),
      rec(json!({"id": "3", "group_id": "g2", "flagged": false})),
    ])
    .await
    .unwrap();

  let patch = rec(json!({"flagged": true})).into_fields();
  let n = s
    .collection(collections::STUDENTS)
    .update("group_id", "g1", patch)
    .await
    .unwrap();
  assert_eq!(n, 2);

  let untouched = s
    .collection(collections::STUDENTS)
    .filter_equals("id", "3")
    .first()
    .await
    .unwrap();
  assert_eq!(untouched.get("flagged"), Some(&json!(false)));
}

#[tokio::test]
async fn update_on_absent_key_is_zero_count() {
  let s = store().await;
  let patch = rec(json!({"name": "x"})).into_fields();
  let n = s
    .collection(collections::STUDENTS)
    .update("id", "missing", patch)
    .await
    .unwrap();
  assert_eq!(n, 0);
}

#[tokio::test]
async fn update_cannot_change_id() {
  let s = store().await;
  s.collection(collections::STUDENTS)
    .insert(vec![rec(json!({"id": "s1", "name": "A"}))])
    .await
    .unwrap();

  let patch = rec(json!({"id": "s2"})).into_fields();
  let err = s
    .collection(collections::STUDENTS)
    .update("id", "s1", patch)
    .await
    .unwrap_err();
  assert!(matches!(err, StoreError::IdImmutable { .. }));

  // Record still reachable under its original id.
  let kept = s
    .collection(collections::STUDENTS)
    .filter_equals("id", "s1")
    .first()
    .await
    .unwrap();
  assert_eq!(kept.get("name"), Some(&json!("A")));
}

// ─── Deletes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_by_id_and_by_field() {
  let s = store().await;
  s.collection(collections::VISITS)
    .insert(vec![
      rec(json!({"id": "v1", "student_id": "s1"})),
      rec(json!({"id": "v2", "student_id": "s1"})),
      rec(json!({"id": "v3", "student_id": "s2"})),
    ])
    .await
    .unwrap();

  let n = s
    .collection(collections::VISITS)
    .delete("student_id", "s1")
    .await
    .unwrap();
  assert_eq!(n, 2);

  let n = s.collection(collections::VISITS).delete("id", "v3").await.unwrap();
  assert_eq!(n, 1);

  let all = s.collection(collections::VISITS).fetch().await.unwrap();
  assert!(all.is_empty());
}

#[tokio::test]
async fn delete_on_absent_key_is_zero_count() {
  let s = store().await;
  let n = s
    .collection(collections::VISITS)
    .delete("id", "missing")
    .await
    .unwrap();
  assert_eq!(n, 0);
}

// ─── Durability ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn contents_survive_close_and_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("rollbook.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.collection(collections::STUDENTS)
      .insert(vec![rec(json!({"id": "s1", "name": "Avi"}))])
      .await
      .unwrap();
    let patch = rec(json!({"name": "Avraham"})).into_fields();
    s.collection(collections::STUDENTS)
      .update("id", "s1", patch)
      .await
      .unwrap();
  }

  let reopened = SqliteStore::open(&path).await.unwrap();
  let r = reopened
    .collection(collections::STUDENTS)
    .filter_equals("id", "s1")
    .first()
    .await
    .unwrap();
  assert_eq!(r.get("name"), Some(&json!("Avraham")));
}

#[tokio::test]
async fn collections_are_isolated() {
  let s = store().await;
  s.collection(collections::STUDENTS)
    .insert(vec![rec(json!({"id": "same-id"}))])
    .await
    .unwrap();

  // The same id in a different collection is not a duplicate.
  s.collection(collections::TEACHERS)
    .insert(vec![rec(json!({"id": "same-id"}))])
    .await
    .unwrap();

  assert_eq!(s.collection(collections::STUDENTS).fetch().await.unwrap().len(), 1);
  assert_eq!(s.collection(collections::TEACHERS).fetch().await.unwrap().len(), 1);
}
