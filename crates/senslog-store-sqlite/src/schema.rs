//! SQL schema for the Senslog SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS auth_tokens (
    token TEXT PRIMARY KEY
);

-- Catalog of sensor capabilities, deduplicated by URI.
-- Rows are only ever inserted; the first writer fixes the description.
CREATE TABLE IF NOT EXISTS sensor_attributes (
    uri         TEXT PRIMARY KEY,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    uuid       TEXT PRIMARY KEY,
    created_at TEXT NOT NULL     -- RFC 3339 UTC, microsecond precision
);

-- Attribute ids are assigned by the external platform and are unique only
-- within their owning subscription. The catalog reference deliberately has
-- no ON DELETE action: a referenced catalog row cannot be deleted.
CREATE TABLE IF NOT EXISTS attribute_subscriptions (
    subscription_uuid TEXT    NOT NULL REFERENCES subscriptions(uuid) ON DELETE CASCADE,
    attribute_id      INTEGER NOT NULL,
    attribute_uri     TEXT    NOT NULL REFERENCES sensor_attributes(uri),
    PRIMARY KEY (subscription_uuid, attribute_id)
);

CREATE TABLE IF NOT EXISTS attribute_values (
    subscription_uuid TEXT    NOT NULL,
    attribute_id      INTEGER NOT NULL,
    value             TEXT    NOT NULL,   -- canonical fixed-point rendering, e.g. '22.3'
    timestamp         TEXT    NOT NULL,   -- RFC 3339 UTC, microsecond precision
    FOREIGN KEY (subscription_uuid, attribute_id)
        REFERENCES attribute_subscriptions(subscription_uuid, attribute_id)
        ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS attribute_values_attr_idx
    ON attribute_values(subscription_uuid, attribute_id, timestamp);

PRAGMA user_version = 1;
";
