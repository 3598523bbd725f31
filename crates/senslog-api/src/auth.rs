//! The auth gate — a shared-secret token check for mutating operations.
//!
//! The external platform authenticates by placing a previously exchanged
//! `auth_token` in the request body. Read-back is not guarded; knowing a
//! subscription's UUID is the capability to read it.

use senslog_core::store::LogStore;

use crate::error::ApiError;

/// Body field carrying the shared secret.
pub const TOKEN_FIELD: &str = "auth_token";

/// Check the `auth_token` field of a raw request body against the token
/// store.
///
/// A missing field, a non-string field, and an unknown token all reject
/// identically; none of them is an internal error. Runs before body
/// validation so that an otherwise malformed request without a valid token
/// still reports 401.
pub async fn authorize<S>(store: &S, body: &serde_json::Value) -> Result<(), ApiError>
where
  S: LogStore,
{
  let Some(token) = body.get(TOKEN_FIELD).and_then(|v| v.as_str()) else {
    return Err(ApiError::Unauthorized);
  };

  if store.token_exists(token).await? {
    Ok(())
  } else {
    Err(ApiError::Unauthorized)
  }
}
