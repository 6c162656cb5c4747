//! The [`RecordStore`] trait and the fluent collection query surface.
//!
//! The trait is implemented by storage backends ([`crate::memory`],
//! `rollbook-store-sqlite`). UI-facing code never touches a backend directly;
//! it goes through [`RecordStoreExt::collection`] and the builder, which
//! mimics a remote-client query surface over purely local storage.
//!
//! Every mutating call fully commits before its future resolves, so
//! sequentially awaited calls serialize and a crash after a resolved call
//! loses nothing. Concurrent non-awaited calls on the same collection have
//! undefined interleaving and must be avoided by callers (the application is
//! single-writer by construction). There is no cancellation.

use std::future::Future;

use serde_json::Value;

use crate::{
  error::{Result, StoreError},
  query::{Filter, Query},
  record::{Patch, Record},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Rollbook record store backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Into<StoreError> + Send + Sync + 'static;

  /// Fetch the records matching `query`, filtered and ordered per
  /// [`crate::query::evaluate`] semantics.
  fn fetch<'a>(
    &'a self,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Append records to a collection. Atomic per call: if any record lacks a
  /// string `id` or any `id` collides with an existing record (or another
  /// record in the same batch), nothing is written.
  fn insert<'a>(
    &'a self,
    collection: &'a str,
    records: Vec<Record>,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Shallow-merge `patch` into every record where `field == value`.
  /// Returns the number of records updated; zero matches is not an error.
  fn update<'a>(
    &'a self,
    collection: &'a str,
    field: &'a str,
    value: &'a Value,
    patch: &'a Patch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Remove every record where `field == value`. Returns the number
  /// removed; zero matches is not an error.
  fn delete<'a>(
    &'a self,
    collection: &'a str,
    field: &'a str,
    value: &'a Value,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}

/// Entry point for the fluent query surface.
pub trait RecordStoreExt: RecordStore {
  /// Scope subsequent operations to a named collection.
  fn collection(&self, name: &str) -> Collection<'_, Self>
  where
    Self: Sized,
  {
    Collection {
      store: self,
      query: Query::for_collection(name),
    }
  }
}

impl<S: RecordStore> RecordStoreExt for S {}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// A query builder scoped to one collection of one store.
///
/// Terminal operations convert backend errors into the closed [`StoreError`]
/// taxonomy, so callers branch on error values rather than backend types.
pub struct Collection<'a, S> {
  store: &'a S,
  query: Query,
}

impl<'a, S: RecordStore> Collection<'a, S> {
  /// Declare an intended projection. Backends may ignore it and return full
  /// records.
  #[must_use]
  pub fn select<I, F>(mut self, fields: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Into<String>,
  {
    self.query.projection =
      Some(fields.into_iter().map(Into::into).collect());
    self
  }

  /// Restrict to records where `field == value`.
  #[must_use]
  pub fn filter_equals(mut self, field: &str, value: impl Into<Value>) -> Self {
    self.query.filter = Some(Filter {
      field: field.to_owned(),
      value: value.into(),
    });
    self
  }

  /// Sort ascending by `field`; stable, records missing the field last.
  #[must_use]
  pub fn order_by(mut self, field: &str) -> Self {
    self.query.order_by = Some(field.to_owned());
    self
  }

  // ── Terminal reads ────────────────────────────────────────────────────

  pub async fn fetch(self) -> Result<Vec<Record>> {
    self.store.fetch(&self.query).await.map_err(Into::into)
  }

  /// The first matching record, or `None`.
  pub async fn maybe_first(self) -> Result<Option<Record>> {
    Ok(self.fetch().await?.into_iter().next())
  }

  /// The first matching record, or [`StoreError::NotFound`].
  pub async fn first(self) -> Result<Record> {
    let collection = self.query.collection.clone();
    self
      .maybe_first()
      .await?
      .ok_or(StoreError::NotFound { collection })
  }

  // ── Terminal writes ───────────────────────────────────────────────────

  pub async fn insert(self, records: Vec<Record>) -> Result<Vec<Record>> {
    self
      .store
      .insert(&self.query.collection, records)
      .await
      .map_err(Into::into)
  }

  pub async fn insert_one(self, record: Record) -> Result<Record> {
    let mut inserted = self.insert(vec![record]).await?;
    match inserted.pop() {
      Some(record) => Ok(record),
      None => Err(StoreError::storage("insert returned no records")),
    }
  }

  pub async fn update(
    self,
    field: &str,
    value: impl Into<Value>,
    patch: Patch,
  ) -> Result<usize> {
    self
      .store
      .update(&self.query.collection, field, &value.into(), &patch)
      .await
      .map_err(Into::into)
  }

  pub async fn delete(self, field: &str, value: impl Into<Value>) -> Result<usize> {
    self
      .store
      .delete(&self.query.collection, field, &value.into())
      .await
      .map_err(Into::into)
  }
}
