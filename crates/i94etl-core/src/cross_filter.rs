use polars::prelude::*;
use tracing::debug;

use crate::schema::TableSchema;
use crate::transform::TransformError;

const PORT_KEYS: TableSchema = TableSchema {
    dataset: "portcodes",
    columns: &["statecode", "municipality"],
};

const DEMOGRAPHIC_KEYS: TableSchema = TableSchema {
    dataset: "usademographics",
    columns: &["state_code", "city"],
};

/// Keeps the demographics rows whose `(state_code, city)` pair appears as a
/// `(statecode, municipality)` pair in the port codes table.
///
/// This is a semi-join: no port columns are added, a city served by several
/// ports still yields each demographics row once, and rows with a null key
/// never match.
pub fn restrict_to_port_cities(
    demographics: &DataFrame,
    ports: &DataFrame,
) -> Result<DataFrame, TransformError> {
    PORT_KEYS.validate(ports)?;
    DEMOGRAPHIC_KEYS.validate(demographics)?;

    let port_keys = ports
        .clone()
        .lazy()
        .select([col("statecode"), col("municipality")]);
    let filtered = demographics
        .clone()
        .lazy()
        .join(
            port_keys,
            [col("state_code"), col("city")],
            [col("statecode"), col("municipality")],
            JoinArgs::new(JoinType::Semi),
        )
        .collect()?;

    debug!(
        input_rows = demographics.height(),
        kept_rows = filtered.height(),
        port_rows = ports.height(),
        "Restricted demographics to port cities"
    );
    Ok(filtered)
}
