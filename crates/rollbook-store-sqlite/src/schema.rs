//! SQL schema for the Rollbook SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` gates future
//! migrations; schema changes must stay additive so existing rows survive an
//! upgrade untouched.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `synchronous = FULL` because the facade promises that a mutation is
/// durable the moment its call resolves.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = FULL;

-- One row per record, across all collections. The body column holds the
-- full record as JSON; the id is duplicated out of the body so the primary
-- key can enforce per-collection uniqueness.
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    body       TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

PRAGMA user_version = 1;
";
