//! JSON REST API for the Senslog data-logging relay.
//!
//! Exposes an axum [`Router`] backed by any
//! [`senslog_core::store::LogStore`]. TLS and transport concerns are the
//! caller's responsibility.
//!
//! Mutating endpoints authenticate with a shared-secret `auth_token` in
//! the request body; read-back is open to anyone holding the subscription
//! UUID.

pub mod auth;
pub mod error;
pub mod subscriptions;
pub mod values;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use senslog_core::store::LogStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `SENSLOG_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: LogStore + 'static,
{
  Router::new()
    .route("/api/subscriptions/", post(subscriptions::create::<S>))
    .route("/api/subscriptions/{uuid}/", get(subscriptions::retrieve::<S>))
    .route(
      "/api/subscriptions/unsubscribe/",
      post(subscriptions::unsubscribe::<S>),
    )
    .route("/api/values/", post(values::submit::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(store)
}

// ─── Body parsing ────────────────────────────────────────────────────────────

/// Deserialise the typed payload out of an already-authorised raw body.
///
/// Handlers read bodies as raw JSON first so the auth gate runs before
/// validation; this turns the second step's failures into 400s.
pub(crate) fn parse_body<T>(body: serde_json::Value) -> Result<T, ApiError>
where
  T: serde::de::DeserializeOwned,
{
  serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use senslog_core::store::LogStore;
  use senslog_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::api_router;

  const TOKEN: &str = "c7f3a1de-7a33-44a4-9e5d-06f1f1a7a24d";
  const TEMP_URI: &str = "http://urn.fi/URN:NBN:fi:au:ucum:r73";

  async fn make_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.add_token(TOKEN).await.unwrap();
    Arc::new(store)
  }

  async fn send(
    store: Arc<SqliteStore>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> axum::response::Response {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    api_router(store).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn create_request(uuid: Uuid) -> Value {
    json!({
      "uuid": uuid,
      "attributes": [{"id": 1, "uri": TEMP_URI, "description": "temperature"}],
      "auth_token": TOKEN,
    })
  }

  // ── Create ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_returns_created_subscription() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    let resp = send(
      store,
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
      body_json(resp).await,
      json!({
        "uuid": uuid,
        "attributes": [{
          "id": 1,
          "uri": TEMP_URI,
          "description": "temperature",
          "values": []
        }]
      })
    );
  }

  #[tokio::test]
  async fn create_without_token_is_unauthorized() {
    let store = make_store().await;
    let mut body = create_request(Uuid::new_v4());
    body.as_object_mut().unwrap().remove("auth_token");

    let resp = send(store.clone(), "POST", "/api/subscriptions/", Some(body)).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(store.list_subscriptions().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn create_with_unknown_token_is_unauthorized() {
    let store = make_store().await;
    let mut body = create_request(Uuid::new_v4());
    body["auth_token"] = json!(Uuid::new_v4());

    let resp = send(store.clone(), "POST", "/api/subscriptions/", Some(body)).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(store.list_subscriptions().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn create_duplicate_uuid_conflicts() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    let first = send(
      store.clone(),
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = send(
      store,
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn create_missing_field_is_bad_request() {
    let store = make_store().await;
    let body = json!({"uuid": Uuid::new_v4(), "auth_token": TOKEN});

    let resp = send(store, "POST", "/api/subscriptions/", Some(body)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn missing_token_wins_over_missing_fields() {
    // The auth gate runs before body validation.
    let store = make_store().await;
    let resp = send(store, "POST", "/api/subscriptions/", Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Retrieve ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn retrieve_unknown_uuid_is_not_found() {
    let store = make_store().await;
    let resp = send(
      store,
      "GET",
      &format!("/api/subscriptions/{}/", Uuid::new_v4()),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Submit / retrieve round trip ────────────────────────────────────────────

  #[tokio::test]
  async fn submit_then_retrieve_round_trip() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    send(
      store.clone(),
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;

    let submit = send(
      store.clone(),
      "POST",
      "/api/values/",
      Some(json!({
        "uuid": uuid,
        "values": [{
          "attribute": 1,
          "timestamp": "2020-02-26T12:29:05.059173Z",
          "value": 22.3
        }],
        "auth_token": TOKEN,
      })),
    )
    .await;

    assert_eq!(submit.status(), StatusCode::CREATED);
    assert_eq!(
      body_json(submit).await,
      json!({
        "uuid": uuid,
        "values": [{
          "attribute": 1,
          "timestamp": "2020-02-26T12:29:05.059173Z",
          "value": "22.3"
        }]
      })
    );

    // Read-back needs no token.
    let retrieve = send(
      store,
      "GET",
      &format!("/api/subscriptions/{uuid}/"),
      None,
    )
    .await;
    assert_eq!(retrieve.status(), StatusCode::OK);
    assert_eq!(
      body_json(retrieve).await,
      json!({
        "uuid": uuid,
        "attributes": [{
          "id": 1,
          "uri": TEMP_URI,
          "description": "temperature",
          "values": [{
            "timestamp": "2020-02-26T12:29:05.059173Z",
            "value": "22.3"
          }]
        }]
      })
    );
  }

  #[tokio::test]
  async fn retrieve_honours_time_filter() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    send(
      store.clone(),
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;
    send(
      store.clone(),
      "POST",
      "/api/values/",
      Some(json!({
        "uuid": uuid,
        "values": [
          {"attribute": 1, "timestamp": "2020-02-26T12:00:00.000000Z", "value": "21.0"},
          {"attribute": 1, "timestamp": "2020-02-26T13:00:00.000000Z", "value": "22.0"},
        ],
        "auth_token": TOKEN,
      })),
    )
    .await;

    let filtered = send(
      store,
      "GET",
      &format!(
        "/api/subscriptions/{uuid}/?values_timestamp_gt=2020-02-26T12:00:00.000000Z"
      ),
      None,
    )
    .await;
    assert_eq!(filtered.status(), StatusCode::OK);

    let values = body_json(filtered).await["attributes"][0]["values"].clone();
    assert_eq!(
      values,
      json!([{"timestamp": "2020-02-26T13:00:00.000000Z", "value": "22.0"}])
    );
  }

  // ── Submit failure modes ────────────────────────────────────────────────────

  #[tokio::test]
  async fn submit_to_unknown_subscription_is_not_found() {
    let store = make_store().await;
    let resp = send(
      store,
      "POST",
      "/api/values/",
      Some(json!({
        "uuid": Uuid::new_v4(),
        "values": [{"attribute": 1, "timestamp": "2020-02-26T12:00:00Z", "value": 1.0}],
        "auth_token": TOKEN,
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn submit_unknown_attribute_is_not_found_and_atomic() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    send(
      store.clone(),
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;

    let resp = send(
      store.clone(),
      "POST",
      "/api/values/",
      Some(json!({
        "uuid": uuid,
        "values": [
          {"attribute": 1, "timestamp": "2020-02-26T12:00:00Z", "value": 1.0},
          {"attribute": 9, "timestamp": "2020-02-26T12:00:01Z", "value": 2.0},
        ],
        "auth_token": TOKEN,
      })),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let error = body_json(resp).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("attribute"), "error names the cause: {error}");
    assert!(error.contains('9'), "error names the offending id: {error}");

    // Nothing from the failed batch was committed.
    let view = send(store, "GET", &format!("/api/subscriptions/{uuid}/"), None).await;
    assert_eq!(body_json(view).await["attributes"][0]["values"], json!([]));
  }

  #[tokio::test]
  async fn submit_rejects_sub_tenth_precision() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    send(
      store.clone(),
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;

    let resp = send(
      store,
      "POST",
      "/api/values/",
      Some(json!({
        "uuid": uuid,
        "values": [{"attribute": 1, "timestamp": "2020-02-26T12:00:00Z", "value": 22.34}],
        "auth_token": TOKEN,
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Unsubscribe ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unsubscribe_deletes_the_subscription() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    send(
      store.clone(),
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;

    let resp = send(
      store.clone(),
      "POST",
      "/api/subscriptions/unsubscribe/",
      Some(json!({"uuid": uuid, "auth_token": TOKEN})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let gone = send(
      store.clone(),
      "GET",
      &format!("/api/subscriptions/{uuid}/"),
      None,
    )
    .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let again = send(
      store,
      "POST",
      "/api/subscriptions/unsubscribe/",
      Some(json!({"uuid": uuid, "auth_token": TOKEN})),
    )
    .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn unsubscribe_without_token_is_unauthorized() {
    let store = make_store().await;
    let uuid = Uuid::new_v4();

    send(
      store.clone(),
      "POST",
      "/api/subscriptions/",
      Some(create_request(uuid)),
    )
    .await;

    let resp = send(
      store.clone(),
      "POST",
      "/api/subscriptions/unsubscribe/",
      Some(json!({"uuid": uuid})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // The subscription is untouched.
    assert_eq!(store.list_subscriptions().await.unwrap().len(), 1);
  }
}
