//! `rollbook` — command-line front end for the record store and the
//! activation pipeline.
//!
//! Reads `rollbook.toml` (or the path given with `--config`), opens the
//! SQLite store it points at, and exposes key generation/validation,
//! activation, and generic collection CRUD. Output is JSON on stdout.
//!
//! # Usage
//!
//! ```
//! rollbook key generate --subject SCHOOL-42 --start 2024-01-01 --end 2024-12-31
//! rollbook activate --subject SCHOOL-42 AB12-CD34-…
//! rollbook list students --filter group_id=g1 --order-by name
//! rollbook insert students '{"id":"s1","name":"Avi","group_id":"g1"}'
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rollbook_activation::Activator;
use rollbook_core::{Record, RecordStoreExt as _};
use rollbook_store_sqlite::SqliteStore;
use serde::Deserialize;
use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "rollbook", about = "Rollbook student-records store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rollbook.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Generate or validate activation keys.
  Key {
    #[command(subcommand)]
    action: KeyAction,
  },

  /// Validate a key and record the activation in the store.
  Activate {
    #[arg(long)]
    subject: String,
    key:     String,
  },

  /// List the records of a collection.
  List {
    collection: String,
    /// Equality filter, as `field=value` (value parsed as JSON, falling
    /// back to a plain string).
    #[arg(long)]
    filter:     Option<String>,
    /// Sort ascending by this field; records missing it come last.
    #[arg(long)]
    order_by:   Option<String>,
  },

  /// Insert a record (JSON object) or a batch (JSON array of objects).
  Insert { collection: String, json: String },

  /// Patch every record where `--field` equals `--value`.
  Update {
    collection: String,
    #[arg(long)]
    field:      String,
    #[arg(long)]
    value:      String,
    patch:      String,
  },

  /// Delete every record where `--field` equals `--value`.
  Delete {
    collection: String,
    #[arg(long)]
    field:      String,
    #[arg(long)]
    value:      String,
  },
}

#[derive(Subcommand)]
enum KeyAction {
  /// Produce a new activation key (administrator tool).
  Generate {
    #[arg(long)]
    subject: String,
    #[arg(long)]
    start:   NaiveDate,
    #[arg(long)]
    end:     NaiveDate,
  },

  /// Check a key without consuming it.
  Validate {
    #[arg(long)]
    subject: String,
    key:     String,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file, overridable with `ROLLBOOK_`-
/// prefixed environment variables.
#[derive(Deserialize)]
struct AppConfig {
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
  PathBuf::from("rollbook.db")
}

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Key generation and validation are pure; no store needed.
  if let Command::Key { action } = &cli.command {
    return run_key(action);
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("ROLLBOOK"))
    .build()
    .context("failed to read configuration")?;
  let app_config: AppConfig = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;

  let store = SqliteStore::open(&app_config.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", app_config.store_path)
    })?;

  match cli.command {
    // Handled before the store was opened.
    Command::Key { .. } => {}

    Command::Activate { subject, key } => {
      let activator = Activator::new(store);
      let subscription = activator.activate(&subject, &key, Utc::now()).await?;
      println!("{}", serde_json::to_string_pretty(&subscription)?);
    }

    Command::List { collection, filter, order_by } => {
      let mut query = store.collection(&collection);
      if let Some(filter) = &filter {
        let (field, value) = parse_filter(filter)?;
        query = query.filter_equals(field, value);
      }
      if let Some(field) = &order_by {
        query = query.order_by(field);
      }
      let records = query.fetch().await?;
      println!("{}", serde_json::to_string_pretty(&records)?);
    }

    Command::Insert { collection, json } => {
      let records = parse_records(&json)?;
      let inserted = store.collection(&collection).insert(records).await?;
      println!("{}", serde_json::to_string_pretty(&inserted)?);
    }

    Command::Update { collection, field, value, patch } => {
      let patch = Record::from_value(serde_json::from_str(&patch)?)
        .context("patch must be a JSON object")?
        .into_fields();
      let updated = store
        .collection(&collection)
        .update(&field, parse_value(&value), patch)
        .await?;
      println!("{{\"updated\": {updated}}}");
    }

    Command::Delete { collection, field, value } => {
      let removed = store
        .collection(&collection)
        .delete(&field, parse_value(&value))
        .await?;
      println!("{{\"deleted\": {removed}}}");
    }
  }

  Ok(())
}

fn run_key(action: &KeyAction) -> Result<()> {
  match action {
    KeyAction::Generate { subject, start, end } => {
      if end < start {
        bail!("--end must not be before --start");
      }
      let key = rollbook_license::generate(subject, *start, *end)?;
      println!("{key}");
    }
    KeyAction::Validate { subject, key } => {
      let payload = rollbook_license::validate(key, subject)?;
      println!("{}", serde_json::to_string_pretty(&payload)?);
    }
  }
  Ok(())
}

// ─── Parsing helpers ──────────────────────────────────────────────────────────

/// `field=value`, with the value parsed as JSON where possible so that
/// `--filter grade=3` matches a numeric field.
fn parse_filter(raw: &str) -> Result<(&str, Value)> {
  let Some((field, value)) = raw.split_once('=') else {
    bail!("filter must look like field=value, got {raw:?}");
  };
  Ok((field, parse_value(value)))
}

fn parse_value(raw: &str) -> Value {
  serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Accept either one JSON object or an array of objects.
fn parse_records(raw: &str) -> Result<Vec<Record>> {
  let value: Value = serde_json::from_str(raw).context("invalid JSON")?;
  let items = match value {
    Value::Array(items) => items,
    other => vec![other],
  };
  items
    .into_iter()
    .map(|item| Record::from_value(item).context("records must be JSON objects"))
    .collect()
}
