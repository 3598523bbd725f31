//! Subscription aggregates — registrations of external sensor feeds.
//!
//! A subscription is a thin envelope identified by an externally supplied
//! UUID. Its meaning lives in the attribute-subscriptions it owns, each
//! binding one external attribute id to one catalog entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

// ─── Persisted types ─────────────────────────────────────────────────────────

/// The envelope row. `uuid` is chosen by the external platform and is
/// immutable; `created_at` is stamped by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
  pub uuid:       Uuid,
  pub created_at: DateTime<Utc>,
}

// ─── Input types ─────────────────────────────────────────────────────────────

/// One attribute entry of a creation request. `attribute_id` is assigned by
/// the external platform and is unique only within the owning subscription;
/// `description` only takes effect if `uri` is new to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttribute {
  #[serde(rename = "id")]
  pub attribute_id: i64,
  pub uri:          String,
  pub description:  String,
}

/// Input to [`LogStore::add_subscription`].
///
/// [`LogStore::add_subscription`]: crate::store::LogStore::add_subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
  pub uuid:       Uuid,
  pub attributes: Vec<NewAttribute>,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// One attribute-subscription with its catalog entry flattened in and its
/// values attached — the shape served on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeView {
  #[serde(rename = "id")]
  pub attribute_id: i64,
  pub uri:          String,
  pub description:  String,
  pub values:       Vec<Value>,
}

/// The computed read model for a subscription — never stored, always
/// assembled from the subscription, its attribute bindings, and their
/// (optionally time-filtered) values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionView {
  pub uuid:       Uuid,
  pub attributes: Vec<AttributeView>,
}
