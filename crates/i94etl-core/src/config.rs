//! Run configuration.
//!
//! A `PipelineConfig` is built once by the caller (file, then environment
//! overrides) and handed to each component explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Row cap applied to every table when `limit_rows` is set.
pub const TEST_ROW_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub warehouse: WarehouseConfig,
    pub object_store: ObjectStoreConfig,
    pub datasets: DatasetPaths,
    /// Cap every table to [`TEST_ROW_LIMIT`] rows before loading.
    pub limit_rows: bool,
    /// Ad-hoc statement executed after the post-load verification.
    pub verification_query: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// `s3://bucket/prefix` or a local directory. Staging is skipped when unset.
    pub staging_location: Option<String>,
    pub max_connections: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            staging_location: None,
            max_connections: 5,
        }
    }
}

impl WarehouseConfig {
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("warehouse.url (or I94ETL_WAREHOUSE_URL)"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub endpoint: Option<String>,
    pub region: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            endpoint: Some("https://s3.amazonaws.com".to_string()),
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    pub port_codes: PathBuf,
    pub state_codes: PathBuf,
    pub airport_codes: PathBuf,
    pub temperatures: PathBuf,
    pub demographics: PathBuf,
    /// Glob matching the immigration Parquet part files.
    pub immigration: String,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            port_codes: PathBuf::from("Datasets/Port_Codes/prtlCodes.json"),
            state_codes: PathBuf::from("Datasets/States/State_Codes.csv"),
            airport_codes: PathBuf::from("Datasets/Airport_Code/airport-codes_csv.csv"),
            temperatures: PathBuf::from(
                "Datasets/Tempature/GlobalLandTemperaturesByState.csv",
            ),
            demographics: PathBuf::from("Datasets/US_Demographics/us-cities-demographics.csv"),
            immigration: "Datasets/Immigration_Data/*.snappy.parquet".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reads `path` when given (defaults otherwise) and applies process
    /// environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps an environment variable
    /// name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("I94ETL_WAREHOUSE_URL").or_else(|| lookup("DATABASE_URL")) {
            self.warehouse.url = Some(url);
        }
        if let Some(user) = lookup("I94ETL_WAREHOUSE_USER") {
            self.warehouse.username = Some(user);
        }
        if let Some(password) = lookup("I94ETL_WAREHOUSE_PASSWORD") {
            self.warehouse.password = Some(password);
        }
        if let Some(location) = lookup("I94ETL_STAGING_LOCATION") {
            self.warehouse.staging_location = Some(location);
        }
        if let Some(key) = lookup("AWS_ACCESS_KEY_ID") {
            self.object_store.access_key = Some(key);
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.object_store.secret_key = Some(secret);
        }
        if let Some(endpoint) = lookup("I94ETL_S3_ENDPOINT") {
            self.object_store.endpoint = Some(endpoint);
        }
        if let Some(raw) = lookup("I94ETL_LIMIT_ROWS") {
            self.limit_rows = parse_flag("I94ETL_LIMIT_ROWS", &raw)?;
        }
        Ok(())
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit_rows.then_some(TEST_ROW_LIMIT)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
