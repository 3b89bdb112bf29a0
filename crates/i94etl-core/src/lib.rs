pub mod config;
pub mod cross_filter;
pub mod dates;
pub mod db;
pub mod error;
pub mod loaders;
pub mod pipeline;
pub mod schema;
pub mod staging;
pub mod transform;
pub mod warehouse;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{TableBatch, TableName};
pub use warehouse::{InMemoryWarehouse, PostgresWarehouse, Warehouse};
