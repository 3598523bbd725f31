//! Handler for `/api/values/` — value ingestion.
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/api/values/` | token in body | 201 + echo of created values |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use senslog_core::{store::LogStore, value::NewValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth, error::ApiError, parse_body};

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub uuid:   Uuid,
  pub values: Vec<NewValue>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  pub uuid:   Uuid,
  pub values: Vec<NewValue>,
}

/// `POST /api/values/` — body: `{uuid, values: [{attribute, timestamp,
/// value}], auth_token}`.
///
/// Appends the batch to the subscription, all-or-nothing: an unknown
/// subscription or attribute id fails the whole request with 404 and
/// persists nothing. Returns 201 echoing the created values.
pub async fn submit<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LogStore,
{
  auth::authorize(store.as_ref(), &body).await?;

  let input: SubmitBody = parse_body(body)?;
  let values = store.submit_values(input.uuid, input.values).await?;
  Ok((
    StatusCode::CREATED,
    Json(SubmitResponse {
      uuid: input.uuid,
      values,
    }),
  ))
}
