//! Subscription activation — the consuming side of the license codec.
//!
//! The codec is stateless; this crate supplies the state: it validates a
//! submitted key, rejects keys whose id already appears in the
//! `activation_history` collection (replay prevention), and creates or
//! extends the subject's `subscriptions` record. Subscriptions are never
//! deleted automatically; later gating logic only reads them.

pub mod error;

use chrono::{DateTime, NaiveDate, Utc};
use rollbook_core::{
  collections, Record, RecordStore, RecordStoreExt as _,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::{Error, Result};

// ─── Records ─────────────────────────────────────────────────────────────────

/// The subscription record that gates feature access elsewhere in the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub id:            String,
  pub subject_id:    String,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  pub active:        bool,
  pub last_key_used: String,
}

/// One consumed key. Keyed by the codec's `unique_key_id`, which is what
/// makes a second submission of the same key detectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationEntry {
  pub id:           String,
  pub key_id:       String,
  pub subject_id:   String,
  pub activated_at: DateTime<Utc>,
}

// ─── Activator ───────────────────────────────────────────────────────────────

/// Performs activations against a record store.
pub struct Activator<S> {
  store: S,
}

impl<S: RecordStore> Activator<S> {
  pub fn new(store: S) -> Self {
    Self { store }
  }

  /// Validate `key` for `subject_id` and, if it has not been consumed
  /// before, record the activation and upsert the subscription.
  pub async fn activate(
    &self,
    subject_id: &str,
    key: &str,
    now: DateTime<Utc>,
  ) -> Result<Subscription> {
    let payload = rollbook_license::validate_at(key, subject_id, now)?;

    let already_used = self
      .store
      .collection(collections::ACTIVATION_HISTORY)
      .filter_equals("key_id", payload.unique_key_id.as_str())
      .maybe_first()
      .await?;
    if already_used.is_some() {
      return Err(Error::KeyAlreadyUsed);
    }

    let existing = self
      .store
      .collection(collections::SUBSCRIPTIONS)
      .filter_equals("subject_id", subject_id)
      .maybe_first()
      .await?;

    let subscription = Subscription {
      // Keep the existing record's id on renewal so the subscription stays a
      // single row per subject.
      id: match &existing {
        Some(record) => record.id()?.to_owned(),
        None => Uuid::new_v4().to_string(),
      },
      subject_id:    subject_id.to_owned(),
      start_date:    payload.start_date,
      end_date:      payload.end_date,
      active:        true,
      last_key_used: payload.unique_key_id.clone(),
    };

    let record = Record::from_serialize(&subscription)?;
    if existing.is_some() {
      self
        .store
        .collection(collections::SUBSCRIPTIONS)
        .update("subject_id", subject_id, record.into_fields())
        .await?;
    } else {
      self
        .store
        .collection(collections::SUBSCRIPTIONS)
        .insert_one(record)
        .await?;
    }

    let entry = ActivationEntry {
      id:           Uuid::new_v4().to_string(),
      key_id:       payload.unique_key_id,
      subject_id:   subject_id.to_owned(),
      activated_at: now,
    };
    self
      .store
      .collection(collections::ACTIVATION_HISTORY)
      .insert_one(Record::from_serialize(&entry)?)
      .await?;

    tracing::info!(
      subject = %subscription.subject_id,
      until = %subscription.end_date,
      "subscription activated"
    );
    Ok(subscription)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
