//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::{collections::HashSet, path::Path};

use rollbook_core::{
  query::{self, Filter, Query},
  record::{Patch, Record},
  store::RecordStore,
  StoreError,
};
use rusqlite::OptionalExtension as _;
use serde_json::Value;

use crate::{schema::SCHEMA, Error, Result};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rollbook record store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The handle
/// is created once at startup and passed to whoever needs it; there is no
/// process-global state.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    tracing::debug!(path = %path.as_ref().display(), "opening record store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read raw record bodies for a collection, optionally narrowed to one id
  /// (the only lookup the engine itself accelerates).
  async fn load(
    &self,
    collection: String,
    id: Option<String>,
  ) -> Result<Vec<Record>> {
    let bodies: Vec<String> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(id) = id {
          let mut stmt = conn.prepare(
            "SELECT body FROM records WHERE collection = ?1 AND id = ?2",
          )?;
          stmt
            .query_map(rusqlite::params![collection, id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
        } else {
          let mut stmt =
            conn.prepare("SELECT body FROM records WHERE collection = ?1")?;
          stmt
            .query_map(rusqlite::params![collection], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
        };
        Ok(rows)
      })
      .await?;

    bodies
      .into_iter()
      .map(|body| serde_json::from_str(&body).map_err(Error::Json))
      .collect()
  }

  /// Rewrite the bodies of already-existing records inside one transaction.
  async fn write_back(
    &self,
    collection: String,
    rows: Vec<(String, String)>,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (id, body) in &rows {
          tx.execute(
            "UPDATE records SET body = ?3 WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id, body],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn encode_rows(records: &[Record]) -> Result<Vec<(String, String)>> {
    records
      .iter()
      .map(|record| {
        let id = record.id().map_err(Error::Store)?.to_owned();
        let body = serde_json::to_string(record)?;
        Ok((id, body))
      })
      .collect()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn fetch(&self, query: &Query) -> Result<Vec<Record>> {
    // Filters on `id` hit the primary key; everything else is evaluated in
    // Rust over the fetched collection.
    let id_lookup = match &query.filter {
      Some(f) if f.field == "id" => f.value.as_str().map(str::to_owned),
      _ => None,
    };

    let records = self.load(query.collection.clone(), id_lookup).await?;
    Ok(query::evaluate(records, query))
  }

  async fn insert(
    &self,
    collection: &str,
    records: Vec<Record>,
  ) -> Result<Vec<Record>> {
    // Validate ids (and in-batch uniqueness) before touching the database.
    let mut batch_ids = HashSet::new();
    for record in &records {
      let id = record.id().map_err(Error::Store)?;
      if !batch_ids.insert(id.to_owned()) {
        return Err(Error::Store(StoreError::DuplicateKey {
          collection: collection.to_owned(),
          id:         id.to_owned(),
        }));
      }
    }

    let rows = Self::encode_rows(&records)?;
    let collection_name = collection.to_owned();

    // Existing-id collisions roll the whole batch back: the transaction is
    // dropped uncommitted and the colliding id is reported through the data
    // path.
    let duplicate: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (id, body) in &rows {
          let exists: bool = tx
            .query_row(
              "SELECT 1 FROM records WHERE collection = ?1 AND id = ?2",
              rusqlite::params![collection_name, id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

          if exists {
            return Ok(Some(id.clone()));
          }

          tx.execute(
            "INSERT INTO records (collection, id, body) VALUES (?1, ?2, ?3)",
            rusqlite::params![collection_name, id, body],
          )?;
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some(id) = duplicate {
      return Err(Error::Store(StoreError::DuplicateKey {
        collection: collection.to_owned(),
        id,
      }));
    }

    Ok(records)
  }

  async fn update(
    &self,
    collection: &str,
    field: &str,
    value: &Value,
    patch: &Patch,
  ) -> Result<usize> {
    let query = Query {
      filter: Some(Filter {
        field: field.to_owned(),
        value: value.clone(),
      }),
      ..Query::for_collection(collection)
    };

    let mut matched = self.fetch(&query).await?;
    if matched.is_empty() {
      return Ok(0);
    }

    for record in &mut matched {
      record.apply_patch(patch).map_err(Error::Store)?;
    }

    let rows = Self::encode_rows(&matched)?;
    let updated = rows.len();
    self.write_back(collection.to_owned(), rows).await?;
    Ok(updated)
  }

  async fn delete(
    &self,
    collection: &str,
    field: &str,
    value: &Value,
  ) -> Result<usize> {
    // Deleting by id needs no read round-trip.
    if field == "id"
      && let Some(id) = value.as_str()
    {
      let collection_name = collection.to_owned();
      let id = id.to_owned();
      let removed = self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection_name, id],
          )?)
        })
        .await?;
      return Ok(removed);
    }

    let query = Query {
      filter: Some(Filter {
        field: field.to_owned(),
        value: value.clone(),
      }),
      ..Query::for_collection(collection)
    };

    let ids: Vec<String> = self
      .fetch(&query)
      .await?
      .iter()
      .map(|record| Ok(record.id().map_err(Error::Store)?.to_owned()))
      .collect::<Result<_>>()?;

    if ids.is_empty() {
      return Ok(0);
    }

    let collection_name = collection.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        for id in &ids {
          removed += tx.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection_name, id],
          )?;
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed)
  }
}
