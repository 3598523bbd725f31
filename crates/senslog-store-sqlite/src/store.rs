//! [`SqliteStore`] — the SQLite implementation of [`LogStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use senslog_core::{
  Error, Result,
  catalog::SensorAttribute,
  store::LogStore,
  subscription::{AttributeView, NewSubscription, Subscription, SubscriptionView},
  value::NewValue,
};

use crate::{
  encode::{
    RawAttribute, RawSubscription, RawValue, encode_dt, encode_measurement,
    encode_uuid,
  },
  schema::SCHEMA,
};

/// Map a backend failure onto the trait's error contract.
fn db_err(e: tokio_rusqlite::Error) -> Error { Error::Storage(e.to_string()) }

// ─── Outcome types ───────────────────────────────────────────────────────────

// Transaction closures report domain-relevant outcomes through the Ok
// channel; the async wrappers below turn them into `senslog_core::Error`
// values. Constraint details stay inside the closure this way.

enum CreateOutcome {
  Created(Vec<AttributeView>),
  DuplicateSubscription,
  DuplicateAttribute(i64),
}

enum SubmitOutcome {
  Created,
  NoSubscription,
  UnknownAttribute(i64),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Senslog store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> crate::Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> crate::Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── LogStore impl ───────────────────────────────────────────────────────────

impl LogStore for SqliteStore {
  // ── Tokens ────────────────────────────────────────────────────────────────

  async fn add_token(&self, token: &str) -> Result<()> {
    let token = token.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO auth_tokens (token) VALUES (?1)",
          rusqlite::params![token],
        )?;
        Ok(())
      })
      .await
      .map_err(db_err)
  }

  async fn remove_token(&self, token: &str) -> Result<bool> {
    let token = token.to_owned();
    self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM auth_tokens WHERE token = ?1",
          rusqlite::params![token],
        )?;
        Ok(n > 0)
      })
      .await
      .map_err(db_err)
  }

  async fn token_exists(&self, token: &str) -> Result<bool> {
    let token = token.to_owned();
    self
      .conn
      .call(move |conn| {
        let hit: Option<bool> = conn
          .query_row(
            "SELECT 1 FROM auth_tokens WHERE token = ?1",
            rusqlite::params![token],
            |_| Ok(true),
          )
          .optional()?;
        Ok(hit.unwrap_or(false))
      })
      .await
      .map_err(db_err)
  }

  async fn list_tokens(&self) -> Result<Vec<String>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT token FROM auth_tokens ORDER BY token")?;
        let tokens = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tokens)
      })
      .await
      .map_err(db_err)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  async fn add_subscription(&self, input: NewSubscription) -> Result<SubscriptionView> {
    let uuid       = input.uuid;
    let uuid_str   = encode_uuid(uuid);
    let created_at = encode_dt(Utc::now());
    let attributes = input.attributes;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The primary key doubles as the concurrency guard: a duplicate
        // racing in from another process fails here just the same.
        match tx.execute(
          "INSERT INTO subscriptions (uuid, created_at) VALUES (?1, ?2)",
          rusqlite::params![uuid_str, created_at],
        ) {
          Ok(_) => {}
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            return Ok(CreateOutcome::DuplicateSubscription);
          }
          Err(e) => return Err(e.into()),
        }

        let mut views = Vec::with_capacity(attributes.len());
        for attr in &attributes {
          // First writer wins: a URI already in the catalog keeps its
          // stored description.
          tx.execute(
            "INSERT OR IGNORE INTO sensor_attributes (uri, description) VALUES (?1, ?2)",
            rusqlite::params![attr.uri, attr.description],
          )?;
          let description: String = tx.query_row(
            "SELECT description FROM sensor_attributes WHERE uri = ?1",
            rusqlite::params![attr.uri],
            |row| row.get(0),
          )?;

          match tx.execute(
            "INSERT INTO attribute_subscriptions
               (subscription_uuid, attribute_id, attribute_uri)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![uuid_str, attr.attribute_id, attr.uri],
          ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
              if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
              return Ok(CreateOutcome::DuplicateAttribute(attr.attribute_id));
            }
            Err(e) => return Err(e.into()),
          }

          views.push(AttributeView {
            attribute_id: attr.attribute_id,
            uri:          attr.uri.clone(),
            description,
            values:       Vec::new(),
          });
        }

        tx.commit()?;
        Ok(CreateOutcome::Created(views))
      })
      .await
      .map_err(db_err)?;

    match outcome {
      CreateOutcome::Created(attributes) => Ok(SubscriptionView { uuid, attributes }),
      CreateOutcome::DuplicateSubscription => Err(Error::SubscriptionExists(uuid)),
      CreateOutcome::DuplicateAttribute(id) => Err(Error::InvalidValue(format!(
        "duplicate attribute id {id} in subscription {uuid}"
      ))),
    }
  }

  async fn get_subscription(
    &self,
    uuid: Uuid,
    values_after: Option<DateTime<Utc>>,
  ) -> Result<Option<SubscriptionView>> {
    let uuid_str  = encode_uuid(uuid);
    let after_str = values_after.map(encode_dt);

    let raw: Option<(Vec<RawAttribute>, Vec<RawValue>)> = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM subscriptions WHERE uuid = ?1",
            rusqlite::params![uuid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok(None);
        }

        let mut stmt = conn.prepare(
          "SELECT a.attribute_id, a.attribute_uri, s.description
           FROM attribute_subscriptions a
           JOIN sensor_attributes s ON s.uri = a.attribute_uri
           WHERE a.subscription_uuid = ?1
           ORDER BY a.attribute_id",
        )?;
        let attrs = stmt
          .query_map(rusqlite::params![uuid_str], |row| {
            Ok(RawAttribute {
              attribute_id: row.get(0)?,
              uri:          row.get(1)?,
              description:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let row_fn = |row: &rusqlite::Row<'_>| {
          Ok(RawValue {
            attribute_id: row.get(0)?,
            timestamp:    row.get(1)?,
            value:        row.get(2)?,
          })
        };

        // One pass over the subscription's values, oldest first. The
        // fixed-precision timestamp encoding makes the string comparison
        // in SQL chronological.
        let values = if let Some(after) = after_str {
          let mut stmt = conn.prepare(
            "SELECT attribute_id, timestamp, value FROM attribute_values
             WHERE subscription_uuid = ?1 AND timestamp > ?2
             ORDER BY timestamp",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![uuid_str, after], row_fn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        } else {
          let mut stmt = conn.prepare(
            "SELECT attribute_id, timestamp, value FROM attribute_values
             WHERE subscription_uuid = ?1
             ORDER BY timestamp",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![uuid_str], row_fn)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        Ok(Some((attrs, values)))
      })
      .await
      .map_err(db_err)?;

    let Some((raw_attrs, raw_values)) = raw else {
      return Ok(None);
    };

    let pairs = raw_values
      .into_iter()
      .map(RawValue::into_pair)
      .collect::<Result<Vec<_>>>()?;

    let attributes = raw_attrs
      .into_iter()
      .map(|attr| {
        let values = pairs
          .iter()
          .filter(|(id, _)| *id == attr.attribute_id)
          .map(|(_, v)| *v)
          .collect();
        attr.into_view(values)
      })
      .collect();

    Ok(Some(SubscriptionView { uuid, attributes }))
  }

  async fn delete_subscription(&self, uuid: Uuid) -> Result<bool> {
    let uuid_str = encode_uuid(uuid);
    self
      .conn
      .call(move |conn| {
        // Foreign-key cascades clean up the attribute bindings and values.
        let n = conn.execute(
          "DELETE FROM subscriptions WHERE uuid = ?1",
          rusqlite::params![uuid_str],
        )?;
        Ok(n > 0)
      })
      .await
      .map_err(db_err)
  }

  async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
    let raws: Vec<RawSubscription> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT uuid, created_at FROM subscriptions ORDER BY created_at")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSubscription {
              uuid:       row.get(0)?,
              created_at: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)?;

    raws
      .into_iter()
      .map(RawSubscription::into_subscription)
      .collect()
  }

  // ── Values ────────────────────────────────────────────────────────────────

  async fn submit_values(&self, uuid: Uuid, values: Vec<NewValue>) -> Result<Vec<NewValue>> {
    let uuid_str = encode_uuid(uuid);
    let rows: Vec<(i64, String, String)> = values
      .iter()
      .map(|v| (v.attribute_id, encode_dt(v.timestamp), encode_measurement(v.value)))
      .collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM subscriptions WHERE uuid = ?1",
            rusqlite::params![uuid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok(SubmitOutcome::NoSubscription);
        }

        // The subscription's own attribute-id namespace.
        let known: HashSet<i64> = {
          let mut stmt = tx.prepare(
            "SELECT attribute_id FROM attribute_subscriptions
             WHERE subscription_uuid = ?1",
          )?;
          let ids = stmt
            .query_map(rusqlite::params![uuid_str], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
          ids
        };

        for (attribute_id, timestamp, value) in &rows {
          if !known.contains(attribute_id) {
            // Dropping the transaction rolls back the rows inserted so
            // far: the whole submission is all-or-nothing.
            return Ok(SubmitOutcome::UnknownAttribute(*attribute_id));
          }
          tx.execute(
            "INSERT INTO attribute_values
               (subscription_uuid, attribute_id, value, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![uuid_str, attribute_id, value, timestamp],
          )?;
        }

        tx.commit()?;
        Ok(SubmitOutcome::Created)
      })
      .await
      .map_err(db_err)?;

    match outcome {
      SubmitOutcome::Created => Ok(values),
      SubmitOutcome::NoSubscription => Err(Error::SubscriptionNotFound(uuid)),
      SubmitOutcome::UnknownAttribute(attribute_id) => Err(Error::AttributeNotFound {
        subscription: uuid,
        attribute_id,
      }),
    }
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn get_attribute_type(&self, uri: &str) -> Result<Option<SensorAttribute>> {
    let uri = uri.to_owned();
    self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uri, description FROM sensor_attributes WHERE uri = ?1",
              rusqlite::params![uri],
              |row| {
                Ok(SensorAttribute {
                  uri:         row.get(0)?,
                  description: row.get(1)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(db_err)
  }

  async fn list_attribute_types(&self) -> Result<Vec<SensorAttribute>> {
    self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT uri, description FROM sensor_attributes ORDER BY uri")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(SensorAttribute {
              uri:         row.get(0)?,
              description: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(db_err)
  }
}
