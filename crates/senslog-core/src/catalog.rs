//! The attribute catalog — a deduplicated registry of sensor capabilities.

use serde::{Deserialize, Serialize};

/// One measurable capability of a sensor (e.g. temperature), identified by
/// a URI supplied by the external platform.
///
/// Exactly one catalog entry exists per distinct `uri`. The first
/// subscription to reference a URI fixes its `description`; descriptions
/// supplied by later subscriptions for the same URI are ignored. Entries
/// are never deleted, even when no subscription references them any more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAttribute {
  pub uri:         String,
  pub description: String,
}
