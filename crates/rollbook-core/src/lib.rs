//! Core types and the store abstraction for the Rollbook record store.
//!
//! This crate is deliberately free of database dependencies. It defines the
//! schema-less [`Record`] model, the [`RecordStore`] trait implemented by
//! storage backends (e.g. `rollbook-store-sqlite`), the fluent
//! [`Collection`] query surface layered on top, and an in-memory backend
//! ([`memory::MemoryStore`]) that doubles as the reference implementation of
//! the facade semantics and the test double for dependent crates.

pub mod collections;
pub mod error;
pub mod memory;
pub mod query;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use record::{Patch, Record};
pub use store::{Collection, RecordStore, RecordStoreExt};
