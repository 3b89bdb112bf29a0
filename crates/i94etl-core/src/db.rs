// crates/i94etl-core/src/db.rs

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::config::WarehouseConfig;
use crate::warehouse::WarehouseError;

pub type DbPool = Pool<Postgres>;

/// Accepts JDBC-style Redshift URLs (`jdbc:redshift://host:5439/db`) as well
/// as plain `postgres://` ones; Redshift speaks the PostgreSQL protocol.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.strip_prefix("jdbc:").unwrap_or(url);
    match url.strip_prefix("redshift://") {
        Some(rest) => format!("postgres://{rest}"),
        None => url.to_string(),
    }
}

/// Opens a connection pool for the configured warehouse. Credentials from the
/// config take precedence over any embedded in the URL.
pub async fn connect(config: &WarehouseConfig) -> Result<DbPool, WarehouseError> {
    let url = normalize_url(config.require_url()?);
    let mut options = PgConnectOptions::from_str(&url)?;
    if let Some(username) = &config.username {
        options = options.username(username);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    info!("Warehouse connection pool established");
    Ok(pool)
}
