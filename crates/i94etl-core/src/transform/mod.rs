//! Per-table transformers. Each one takes the raw source frame(s) and returns
//! the cleaned table that is loaded into the warehouse.

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::schema::SchemaError;

pub mod airports;
pub mod columns;
pub mod demographics;
pub mod immigration;
pub mod port_codes;
pub mod temperatures;

pub use airports::build_airports;
pub use demographics::build_demographics;
pub use immigration::build_immigration;
pub use port_codes::build_port_codes;
pub use temperatures::build_usa_temperatures;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}
