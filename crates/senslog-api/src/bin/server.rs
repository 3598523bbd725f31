//! Senslog server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.
//!
//! # Token administration
//!
//! Tokens are exchanged with the platform operator out-of-band; the server
//! itself mints and revokes them:
//!
//! ```text
//! server --issue-token            # mint, store, and print a new token
//! server --revoke-token <TOKEN>   # remove a token
//! server --list-tokens            # print all valid tokens
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use senslog_api::ServerConfig;
use senslog_core::store::LogStore as _;
use senslog_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Senslog data-logging relay")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Mint a new auth token, store it, print it, and exit.
  #[arg(long)]
  issue_token: bool,

  /// Remove the given auth token and exit.
  #[arg(long, value_name = "TOKEN")]
  revoke_token: Option<String>,

  /// Print all valid auth tokens and exit.
  #[arg(long)]
  list_tokens: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SENSLOG"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper modes: token administration, then exit.
  if cli.issue_token {
    let token = Uuid::new_v4().to_string();
    store.add_token(&token).await?;
    println!("{token}");
    return Ok(());
  }
  if let Some(token) = cli.revoke_token {
    if !store.remove_token(&token).await? {
      anyhow::bail!("no such token");
    }
    return Ok(());
  }
  if cli.list_tokens {
    for token in store.list_tokens().await? {
      println!("{token}");
    }
    return Ok(());
  }

  let app = senslog_api::api_router(Arc::new(store));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
