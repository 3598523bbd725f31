//! The `LogStore` trait — the storage seam of the relay.
//!
//! The trait is implemented by storage backends (e.g.
//! `senslog-store-sqlite`). The HTTP layer depends on this abstraction,
//! not on any concrete backend. Methods return [`crate::Error`] directly
//! so the boundary can classify domain failures (conflict, not-found)
//! without inspecting backend internals.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  catalog::SensorAttribute,
  subscription::{NewSubscription, Subscription, SubscriptionView},
  value::NewValue,
};

/// Abstraction over a Senslog storage backend.
pub trait LogStore: Send + Sync {
  // ── Tokens ────────────────────────────────────────────────────────────

  /// Persist a shared-secret token. Tokens never expire; they are removed
  /// only by an explicit [`remove_token`](Self::remove_token).
  fn add_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Remove a token. Returns `false` if no such token existed.
  fn remove_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  /// Membership check used by the auth gate on mutating operations.
  fn token_exists<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  /// List all valid tokens.
  fn list_tokens(&self) -> impl Future<Output = Result<Vec<String>>> + Send + '_;

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Create a subscription together with its attribute bindings.
  ///
  /// Each attribute entry is reconciled against the catalog: a new `uri`
  /// creates an entry with the supplied description, a known `uri` reuses
  /// the stored entry unchanged. The whole operation is atomic. Fails with
  /// [`Error::SubscriptionExists`](crate::Error::SubscriptionExists) if
  /// the UUID is already taken.
  ///
  /// Returns the created subscription as a view with empty value lists and
  /// the descriptions actually stored in the catalog.
  fn add_subscription(
    &self,
    input: NewSubscription,
  ) -> impl Future<Output = Result<SubscriptionView>> + Send + '_;

  /// Assemble the read model for a subscription. Returns `None` if the
  /// UUID is unknown.
  ///
  /// When `values_after` is set, only values with a strictly greater
  /// timestamp are included. Values are sorted ascending by timestamp.
  fn get_subscription(
    &self,
    uuid: Uuid,
    values_after: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Option<SubscriptionView>>> + Send + '_;

  /// Delete a subscription, cascading to its attribute bindings and their
  /// values. Returns `false` if the UUID is unknown. Catalog entries are
  /// left in place.
  fn delete_subscription(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  /// List all subscription envelopes.
  fn list_subscriptions(
    &self,
  ) -> impl Future<Output = Result<Vec<Subscription>>> + Send + '_;

  // ── Values ────────────────────────────────────────────────────────────

  /// Append a batch of values to a subscription, all-or-nothing.
  ///
  /// Every entry is resolved through the subscription's own attribute-id
  /// namespace. Fails with
  /// [`Error::SubscriptionNotFound`](crate::Error::SubscriptionNotFound)
  /// for an unknown UUID and
  /// [`Error::AttributeNotFound`](crate::Error::AttributeNotFound) for an
  /// id not bound to the subscription; in both cases nothing is persisted.
  /// Returns the persisted values for the response echo.
  fn submit_values(
    &self,
    uuid: Uuid,
    values: Vec<NewValue>,
  ) -> impl Future<Output = Result<Vec<NewValue>>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Look up a catalog entry by URI.
  fn get_attribute_type<'a>(
    &'a self,
    uri: &'a str,
  ) -> impl Future<Output = Result<Option<SensorAttribute>>> + Send + 'a;

  /// List all catalog entries, including orphaned ones.
  fn list_attribute_types(
    &self,
  ) -> impl Future<Output = Result<Vec<SensorAttribute>>> + Send + '_;
}
