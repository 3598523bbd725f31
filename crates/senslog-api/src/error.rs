//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Classify domain failures into HTTP-shaped errors. This is the single
/// place where the core taxonomy meets status codes.
impl From<senslog_core::Error> for ApiError {
  fn from(e: senslog_core::Error) -> Self {
    use senslog_core::Error as E;
    match e {
      E::SubscriptionExists(_) => ApiError::Conflict(e.to_string()),
      E::SubscriptionNotFound(_) | E::AttributeNotFound { .. } => {
        ApiError::NotFound(e.to_string())
      }
      E::InvalidValue(_) | E::ValueOutOfRange(_) => ApiError::BadRequest(e.to_string()),
      E::Storage(_) => ApiError::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
