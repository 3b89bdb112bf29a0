//! Pipeline driver: load sources, build the five tables, append them to the
//! warehouse and check that each destination holds rows afterwards.

use std::fmt;

use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{DatasetPaths, PipelineConfig};
use crate::cross_filter::restrict_to_port_cities;
use crate::error::Result;
use crate::loaders::{
    load_csv, load_json_lines, load_parquet_glob, load_validated, CsvSource,
};
use crate::schema::{
    AIRPORT_CODES_SOURCE, DEMOGRAPHICS_SOURCE, IMMIGRATION_SOURCE, PORT_CODES_SOURCE,
    STATE_CODES_SOURCE, TEMPERATURES_SOURCE,
};
use crate::transform::{
    build_airports, build_demographics, build_immigration, build_port_codes,
    build_usa_temperatures,
};
use crate::warehouse::{Warehouse, WarehouseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    PortCodes,
    Airports,
    UsaTemp,
    UsaDemographics,
    Immigration,
}

impl TableName {
    /// Build and load order.
    pub const ALL: [TableName; 5] = [
        TableName::PortCodes,
        TableName::Airports,
        TableName::UsaTemp,
        TableName::UsaDemographics,
        TableName::Immigration,
    ];

    pub fn destination(&self) -> &'static str {
        match self {
            TableName::PortCodes => "portcodes",
            TableName::Airports => "airports",
            TableName::UsaTemp => "usatemp",
            TableName::UsaDemographics => "usademographics",
            TableName::Immigration => "immigration",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.destination())
    }
}

/// Finished tables in load order.
#[derive(Debug, Default, Clone)]
pub struct TableBatch {
    tables: Vec<(TableName, DataFrame)>,
}

impl TableBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: TableName, frame: DataFrame) {
        self.tables.push((name, frame));
    }

    pub fn get(&self, name: TableName) -> Option<&DataFrame> {
        self.tables
            .iter()
            .find(|(table, _)| *table == name)
            .map(|(_, frame)| frame)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableName, &DataFrame)> {
        self.tables.iter().map(|(name, frame)| (*name, frame))
    }

    pub fn names(&self) -> Vec<TableName> {
        self.tables.iter().map(|(name, _)| *name).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Caps every table to its first `limit` rows.
    pub fn limited(self, limit: usize) -> Self {
        Self {
            tables: self
                .tables
                .into_iter()
                .map(|(name, frame)| (name, frame.head(Some(limit))))
                .collect(),
        }
    }
}

/// Raw source frames, already checked against their declared columns.
#[derive(Debug, Clone)]
pub struct SourceFrames {
    pub port_codes: DataFrame,
    pub state_codes: DataFrame,
    pub airport_codes: DataFrame,
    pub temperatures: DataFrame,
    pub demographics: DataFrame,
    pub immigration: DataFrame,
}

pub fn load_sources(paths: &DatasetPaths) -> Result<SourceFrames> {
    let port_codes = load_validated(&PORT_CODES_SOURCE, || load_json_lines(&paths.port_codes))?;
    let state_codes = load_validated(&STATE_CODES_SOURCE, || {
        load_csv(&paths.state_codes, CsvSource::default().with_inferred_schema())
    })?;
    let airport_codes = load_validated(&AIRPORT_CODES_SOURCE, || {
        load_csv(&paths.airport_codes, CsvSource::default())
    })?;
    let temperatures = load_validated(&TEMPERATURES_SOURCE, || {
        load_csv(&paths.temperatures, CsvSource::default().with_inferred_schema())
    })?;
    let demographics = load_validated(&DEMOGRAPHICS_SOURCE, || {
        load_csv(&paths.demographics, CsvSource::default().with_delimiter(b';'))
    })?;
    let immigration = load_validated(&IMMIGRATION_SOURCE, || {
        load_parquet_glob(&paths.immigration)
    })?;

    info!(
        port_codes = port_codes.height(),
        state_codes = state_codes.height(),
        airport_codes = airport_codes.height(),
        temperatures = temperatures.height(),
        demographics = demographics.height(),
        immigration = immigration.height(),
        "Loaded source datasets"
    );

    Ok(SourceFrames {
        port_codes,
        state_codes,
        airport_codes,
        temperatures,
        demographics,
        immigration,
    })
}

/// Runs every transformer in load order. Demographics are restricted to the
/// cities of the already built port codes table.
pub fn transform_sources(sources: &SourceFrames) -> Result<TableBatch> {
    let mut batch = TableBatch::new();

    let port_codes = build_port_codes(&sources.port_codes, &sources.state_codes)?;
    log_built(TableName::PortCodes, &port_codes);

    let airports = build_airports(&sources.airport_codes)?;
    log_built(TableName::Airports, &airports);

    let temperatures = build_usa_temperatures(&sources.temperatures)?;
    log_built(TableName::UsaTemp, &temperatures);

    let demographics = restrict_to_port_cities(
        &build_demographics(&sources.demographics)?,
        &port_codes,
    )?;
    log_built(TableName::UsaDemographics, &demographics);

    let immigration = build_immigration(&sources.immigration)?;
    log_built(TableName::Immigration, &immigration);

    batch.push(TableName::PortCodes, port_codes);
    batch.push(TableName::Airports, airports);
    batch.push(TableName::UsaTemp, temperatures);
    batch.push(TableName::UsaDemographics, demographics);
    batch.push(TableName::Immigration, immigration);
    Ok(batch)
}

fn log_built(name: TableName, frame: &DataFrame) {
    info!(
        table = name.destination(),
        rows = frame.height(),
        columns = frame.width(),
        "Built table"
    );
}

/// Loads the sources and builds all tables, applying the configured row cap.
pub fn build_tables(config: &PipelineConfig) -> Result<TableBatch> {
    let sources = load_sources(&config.datasets)?;
    let batch = transform_sources(&sources)?;
    Ok(match config.row_limit() {
        Some(limit) => {
            info!(limit, "Capping table sizes");
            batch.limited(limit)
        }
        None => batch,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedTable {
    pub table: TableName,
    pub rows_written: u64,
}

/// Appends every table in order. The first failure aborts the remaining
/// writes; tables already written stay written.
pub async fn load_batch(warehouse: &dyn Warehouse, batch: &TableBatch) -> Result<Vec<LoadedTable>> {
    let mut loaded = Vec::with_capacity(batch.len());
    for (name, frame) in batch.iter() {
        let rows_written = warehouse.write(frame, name.destination()).await?;
        info!(table = name.destination(), rows = rows_written, "Loaded table");
        loaded.push(LoadedTable {
            table: name,
            rows_written,
        });
    }
    Ok(loaded)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub table: TableName,
    pub row_count: usize,
    pub status: VerificationStatus,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.status == VerificationStatus::Passed
    }
}

/// Re-reads the row count of each destination. An empty or missing
/// destination is reported and logged but does not stop the check of the
/// others.
pub async fn verify_tables(warehouse: &dyn Warehouse, tables: &[TableName]) -> Result<Vec<Verification>> {
    let mut results = Vec::with_capacity(tables.len());
    for &table in tables {
        let row_count = match warehouse.row_count(table.destination()).await {
            Ok(count) => Some(count),
            Err(WarehouseError::NotFound(_)) => None,
            Err(err) => return Err(err.into()),
        };
        let status = match row_count {
            None => {
                warn!(table = table.destination(), "Row count incorrect: destination does not exist");
                VerificationStatus::Failed
            }
            Some(0) => {
                warn!(table = table.destination(), "Row count incorrect: destination is empty");
                VerificationStatus::Failed
            }
            Some(rows) => {
                info!(table = table.destination(), rows, "Row count correct");
                VerificationStatus::Passed
            }
        };
        results.push(Verification {
            table,
            row_count: row_count.unwrap_or(0),
            status,
        });
    }
    Ok(results)
}

pub async fn verify_batch(warehouse: &dyn Warehouse, batch: &TableBatch) -> Result<Vec<Verification>> {
    verify_tables(warehouse, &batch.names()).await
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub loaded: Vec<LoadedTable>,
    pub verifications: Vec<Verification>,
    pub query_result: Option<DataFrame>,
}

impl RunReport {
    pub fn all_verified(&self) -> bool {
        self.verifications.iter().all(Verification::passed)
    }
}

/// Full run: build, load, verify, then the optional verification query.
pub async fn run(config: &PipelineConfig, warehouse: &dyn Warehouse) -> Result<RunReport> {
    let batch = build_tables(config)?;
    let loaded = load_batch(warehouse, &batch).await?;
    let verifications = verify_batch(warehouse, &batch).await?;

    let query_result = match &config.verification_query {
        Some(sql) => {
            let result = warehouse.query(sql).await?;
            info!(rows = result.height(), "Verification query finished");
            Some(result)
        }
        None => None,
    };

    Ok(RunReport {
        loaded,
        verifications,
        query_result,
    })
}
