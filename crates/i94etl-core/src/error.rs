// crates/i94etl-core/src/error.rs

use thiserror::Error;

use crate::config::ConfigError;
use crate::loaders::LoadError;
use crate::schema::SchemaError;
use crate::staging::StagingError;
use crate::transform::TransformError;
use crate::warehouse::WarehouseError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load source data: {0}")]
    Load(#[from] LoadError),

    #[error("Schema check failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("Transformation failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Warehouse operation failed: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Staging failed: {0}")]
    Staging(#[from] StagingError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
