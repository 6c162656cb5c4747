//! Query description and the in-Rust evaluation shared by backends.
//!
//! Collections never exceed a few thousand rows, so filtering and ordering
//! happen over the fetched rows rather than in the engine. Both backends call
//! [`evaluate`] so their semantics cannot drift apart.

use std::cmp::Ordering;

use serde_json::Value;

use crate::record::Record;

// ─── Query types ─────────────────────────────────────────────────────────────

/// A single-collection query: optional equality filter, optional ascending
/// order, optional projection.
#[derive(Debug, Clone)]
pub struct Query {
  pub collection: String,
  pub filter:     Option<Filter>,
  pub order_by:   Option<String>,
  /// Declared projection. Backends are permitted to ignore it and return
  /// full records; it exists so callers can state intent.
  pub projection: Option<Vec<String>>,
}

impl Query {
  pub fn for_collection(name: impl Into<String>) -> Self {
    Self {
      collection: name.into(),
      filter:     None,
      order_by:   None,
      projection: None,
    }
  }
}

/// An equality restriction: `record[field] == value` under JSON equality.
#[derive(Debug, Clone)]
pub struct Filter {
  pub field: String,
  pub value: Value,
}

pub fn matches(record: &Record, filter: &Filter) -> bool {
  record.get(&filter.field) == Some(&filter.value)
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Apply `query`'s filter and ordering to a fetched collection.
pub fn evaluate(mut records: Vec<Record>, query: &Query) -> Vec<Record> {
  if let Some(filter) = &query.filter {
    records.retain(|r| matches(r, filter));
  }
  if let Some(field) = &query.order_by {
    // sort_by is stable, so equal keys keep their relative order.
    records.sort_by(|a, b| compare_by_field(a, b, field));
  }
  records
}

/// The ordering used by `order_by`, ascending.
///
/// Records missing the field sort after all records that have it. Present
/// values follow a fixed cross-type rank (null < bool < number < string <
/// array < object); numbers compare as f64, strings by code point.
pub fn compare_by_field(a: &Record, b: &Record, field: &str) -> Ordering {
  match (a.get(field), b.get(field)) {
    (Some(x), Some(y)) => compare_values(x, y),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  }
}

fn type_rank(value: &Value) -> u8 {
  match value {
    Value::Null => 0,
    Value::Bool(_) => 1,
    Value::Number(_) => 2,
    Value::String(_) => 3,
    Value::Array(_) => 4,
    Value::Object(_) => 5,
  }
}

pub fn compare_values(a: &Value, b: &Value) -> Ordering {
  let rank = type_rank(a).cmp(&type_rank(b));
  if rank != Ordering::Equal {
    return rank;
  }

  match (a, b) {
    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
    (Value::Number(x), Value::Number(y)) => x
      .as_f64()
      .unwrap_or(f64::NAN)
      .total_cmp(&y.as_f64().unwrap_or(f64::NAN)),
    (Value::String(x), Value::String(y)) => x.cmp(y),
    (Value::Array(x), Value::Array(y)) => {
      for (xi, yi) in x.iter().zip(y.iter()) {
        let o = compare_values(xi, yi);
        if o != Ordering::Equal {
          return o;
        }
      }
      x.len().cmp(&y.len())
    }
    // Objects have no natural order; compare their compact serialisation so
    // the result is at least deterministic.
    (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
    _ => Ordering::Equal,
  }
}
