//! The relational sink the finished tables are appended to.

use async_trait::async_trait;
use polars::prelude::{DataFrame, PolarsError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::staging::StagingError;

mod memory;
mod postgres;
pub mod sql;

pub use memory::InMemoryWarehouse;
pub use postgres::PostgresWarehouse;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database operation failed: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("staging failed: {0}")]
    Staging(#[from] StagingError),
    #[error("column {column} has unsupported warehouse type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },
    #[error("rows for {destination} do not match its existing schema: {source}")]
    SchemaMismatch {
        destination: String,
        #[source]
        source: PolarsError,
    },
    #[error("destination {0} does not exist")]
    NotFound(String),
    #[error("{0}")]
    Unsupported(&'static str),
}

/// Append-only sink. `write` never truncates or replaces existing rows, and
/// writes to different destinations are independent: a failure leaves the
/// earlier ones in place.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Appends every row of `table` to `destination`, creating it when
    /// missing. Returns the number of rows written.
    async fn write(&self, table: &DataFrame, destination: &str) -> Result<u64, WarehouseError>;

    /// Full contents of `destination`.
    async fn read(&self, destination: &str) -> Result<DataFrame, WarehouseError>;

    /// Runs a read-only statement and returns its result set.
    async fn query(&self, sql: &str) -> Result<DataFrame, WarehouseError>;

    async fn row_count(&self, destination: &str) -> Result<usize, WarehouseError> {
        Ok(self.read(destination).await?.height())
    }
}
