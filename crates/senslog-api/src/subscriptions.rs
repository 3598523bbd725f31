//! Handlers for `/api/subscriptions/` endpoints.
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/api/subscriptions/` | token in body | 201 + subscription JSON |
//! | `GET`  | `/api/subscriptions/{uuid}/` | none | optional `?values_timestamp_gt=` |
//! | `POST` | `/api/subscriptions/unsubscribe/` | token in body | 204 on success |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use senslog_core::{
  store::LogStore,
  subscription::{NewSubscription, SubscriptionView},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth, error::ApiError, parse_body};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /api/subscriptions/` — body: `{uuid, attributes: [{id, uri,
/// description}], auth_token}`.
///
/// Registers the subscription, reconciling each attribute against the
/// catalog. Returns 201 with the created subscription; every attribute has
/// an empty value list.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LogStore,
{
  auth::authorize(store.as_ref(), &body).await?;

  let input: NewSubscription = parse_body(body)?;
  let view = store.add_subscription(input).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Retrieve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
  /// If set, only values with a strictly greater timestamp are returned.
  pub values_timestamp_gt: Option<DateTime<Utc>>,
}

/// `GET /api/subscriptions/{uuid}/[?values_timestamp_gt=<rfc3339>]`
///
/// No auth gate here: the UUID itself is the read capability.
pub async fn retrieve<S>(
  State(store): State<Arc<S>>,
  Path(uuid): Path<Uuid>,
  Query(params): Query<RetrieveParams>,
) -> Result<Json<SubscriptionView>, ApiError>
where
  S: LogStore,
{
  let view = store
    .get_subscription(uuid, params.values_timestamp_gt)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("subscription {uuid} not found")))?;
  Ok(Json(view))
}

// ─── Unsubscribe ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
  pub uuid: Uuid,
}

/// `POST /api/subscriptions/unsubscribe/` — body: `{uuid, auth_token}`.
///
/// Deletes the subscription and, via cascade, its attribute bindings and
/// values. Catalog entries stay behind. Returns 204 with an empty body.
pub async fn unsubscribe<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError>
where
  S: LogStore,
{
  auth::authorize(store.as_ref(), &body).await?;

  let input: UnsubscribeBody = parse_body(body)?;
  if store.delete_subscription(input.uuid).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!(
      "subscription {} not found",
      input.uuid
    )))
  }
}
