//! Error types for `senslog-core`.
//!
//! This is the error contract of the [`LogStore`](crate::store::LogStore)
//! trait: backends translate their internal failures into these variants so
//! the HTTP boundary can classify them without knowing the backend.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A subscription with the same externally supplied UUID already exists.
  #[error("subscription already exists: {0}")]
  SubscriptionExists(Uuid),

  #[error("subscription not found: {0}")]
  SubscriptionNotFound(Uuid),

  /// An ingested value referenced an attribute id that is not bound to the
  /// subscription. Attribute ids are scoped per subscription.
  #[error("subscription {subscription} has no attribute with id {attribute_id}")]
  AttributeNotFound {
    subscription: Uuid,
    attribute_id: i64,
  },

  #[error("invalid value: {0}")]
  InvalidValue(String),

  /// A measurement with more than [`Measurement::MAX_DIGITS`] total digits.
  ///
  /// [`Measurement::MAX_DIGITS`]: crate::value::Measurement::MAX_DIGITS
  #[error("value out of range: {0}")]
  ValueOutOfRange(String),

  /// A failure reported by the storage backend itself.
  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
