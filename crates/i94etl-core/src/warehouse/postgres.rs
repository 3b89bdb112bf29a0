use async_trait::async_trait;
use polars::prelude::DataFrame;
use sqlx::{Executor, Postgres, QueryBuilder, Row, Statement};
use tracing::{debug, info};

use super::sql::{
    create_table_sql, frame_from_rows, insert_prefix, quote_ident, rows_per_statement,
    sql_columns,
};
use super::{Warehouse, WarehouseError};
use crate::config::PipelineConfig;
use crate::db::{self, DbPool};
use crate::staging::StagingArea;

/// SQLSTATE `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

/// Maps "relation does not exist" onto [`WarehouseError::NotFound`].
fn missing_destination(err: WarehouseError, destination: &str) -> WarehouseError {
    let missing = matches!(
        &err,
        WarehouseError::Sqlx(sqlx_err)
            if sqlx_err
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .as_deref()
                == Some(UNDEFINED_TABLE)
    );
    if missing {
        WarehouseError::NotFound(destination.to_string())
    } else {
        err
    }
}

/// Warehouse reached over the PostgreSQL protocol (PostgreSQL or Redshift).
pub struct PostgresWarehouse {
    pool: DbPool,
    staging: Option<StagingArea>,
}

impl PostgresWarehouse {
    pub fn new(pool: DbPool, staging: Option<StagingArea>) -> Self {
        Self { pool, staging }
    }

    /// Connects using the warehouse section of `config` and, when a staging
    /// location is configured, prepares the staging area.
    pub async fn connect(config: &PipelineConfig) -> Result<Self, WarehouseError> {
        let pool = db::connect(&config.warehouse).await?;
        let staging = match &config.warehouse.staging_location {
            Some(location) => Some(StagingArea::from_location(location, &config.object_store).await?),
            None => None,
        };
        Ok(Self::new(pool, staging))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    async fn write(&self, table: &DataFrame, destination: &str) -> Result<u64, WarehouseError> {
        let columns = sql_columns(table)?;
        if columns.is_empty() {
            debug!(destination, "Skipping write of a frame without columns");
            return Ok(0);
        }

        if let Some(staging) = &self.staging {
            let location = staging.stage(destination, table).await?;
            info!(destination, %location, "Staged table");
        }

        let height = table.height();
        let chunk_rows = rows_per_statement(columns.len());
        let prefix = insert_prefix(destination, &columns);
        let mut written = 0u64;

        let mut tx = self.pool.begin().await?;
        sqlx::query(&create_table_sql(destination, &columns))
            .execute(tx.as_mut())
            .await?;

        let mut start = 0;
        while start < height {
            let end = (start + chunk_rows).min(height);
            let mut builder = QueryBuilder::<Postgres>::new(prefix.as_str());
            builder.push_values(start..end, |mut row, idx| {
                for column in &columns {
                    column.push_bind(&mut row, idx);
                }
            });
            let result = builder.build().execute(tx.as_mut()).await?;
            written += result.rows_affected();
            start = end;
        }

        tx.commit().await?;
        info!(destination, rows = written, "Appended rows");
        Ok(written)
    }

    async fn read(&self, destination: &str) -> Result<DataFrame, WarehouseError> {
        let sql = format!("SELECT * FROM {}", quote_ident(destination));
        self.query(&sql)
            .await
            .map_err(|err| missing_destination(err, destination))
    }

    async fn query(&self, sql: &str) -> Result<DataFrame, WarehouseError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        match rows.first() {
            Some(first) => frame_from_rows(first.columns(), &rows),
            None => {
                // No row to take column metadata from; describe the statement.
                let statement = self.pool.prepare(sql).await?;
                frame_from_rows(statement.columns(), &rows)
            }
        }
    }

    async fn row_count(&self, destination: &str) -> Result<usize, WarehouseError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(destination));
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| missing_destination(err.into(), destination))?;
        Ok(count.max(0) as usize)
    }
}
