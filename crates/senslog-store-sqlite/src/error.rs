//! Error type for `senslog-store-sqlite`.
//!
//! Only opening and initialising a store report this type. Once open, all
//! operations go through [`senslog_core::store::LogStore`] and report
//! [`senslog_core::Error`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
