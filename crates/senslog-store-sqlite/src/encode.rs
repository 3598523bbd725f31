//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond
//! precision and a `Z` suffix, so lexicographic comparison in SQL equals
//! chronological comparison. UUIDs are stored as hyphenated lowercase
//! strings; measurements in their canonical one-fractional-digit form.
//!
//! Decode failures mean a row the store itself could not have written, so
//! they surface as [`Error::Storage`].

use chrono::{DateTime, SecondsFormat, Utc};
use senslog_core::{
  Error, Result,
  subscription::{AttributeView, Subscription},
  value::{Measurement, Value},
};
use uuid::Uuid;

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| Error::Storage(format!("malformed uuid in database: {e}")))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Storage(format!("malformed timestamp in database: {e}")))
}

// ─── Measurement ─────────────────────────────────────────────────────────────

pub fn encode_measurement(m: Measurement) -> String { m.to_string() }

pub fn decode_measurement(s: &str) -> Result<Measurement> {
  Measurement::parse(s)
    .map_err(|e| Error::Storage(format!("malformed value in database: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `subscriptions` row.
pub struct RawSubscription {
  pub uuid:       String,
  pub created_at: String,
}

impl RawSubscription {
  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      uuid:       decode_uuid(&self.uuid)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// An `attribute_subscriptions` row joined with its catalog entry.
pub struct RawAttribute {
  pub attribute_id: i64,
  pub uri:          String,
  pub description:  String,
}

impl RawAttribute {
  pub fn into_view(self, values: Vec<Value>) -> AttributeView {
    AttributeView {
      attribute_id: self.attribute_id,
      uri:          self.uri,
      description:  self.description,
      values,
    }
  }
}

/// Raw strings read directly from an `attribute_values` row.
pub struct RawValue {
  pub attribute_id: i64,
  pub timestamp:    String,
  pub value:        String,
}

impl RawValue {
  /// Decode into the owning attribute id and the value itself.
  pub fn into_pair(self) -> Result<(i64, Value)> {
    Ok((
      self.attribute_id,
      Value {
        timestamp: decode_dt(&self.timestamp)?,
        value:     decode_measurement(&self.value)?,
      },
    ))
  }
}
