use std::fs::File;
use std::path::{Path, PathBuf};

use glob::glob;
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::schema::{SchemaError, TableSchema};

/// Rows scanned for CSV type inference when it is enabled.
const INFER_SCHEMA_ROWS: usize = 1000;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("invalid glob pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },
    #[error("no files matched {0}")]
    NoMatches(String),
    #[error("part file {path} does not match the first part's schema: {source}")]
    PartMismatch {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Options for a delimited text source.
#[derive(Debug, Clone, Copy)]
pub struct CsvSource {
    pub delimiter: u8,
    pub has_header: bool,
    /// When false every column is read as a string.
    pub infer_schema: bool,
}

impl Default for CsvSource {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            infer_schema: false,
        }
    }
}

impl CsvSource {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_inferred_schema(mut self) -> Self {
        self.infer_schema = true;
        self
    }
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads newline-delimited JSON, one record per line.
pub fn load_json_lines(path: &Path) -> Result<DataFrame, LoadError> {
    let file = open(path)?;
    let df = JsonLineReader::new(file)
        .finish()
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), rows = df.height(), "Loaded JSON lines");
    Ok(df)
}

pub fn load_csv(path: &Path, source: CsvSource) -> Result<DataFrame, LoadError> {
    // Checked up front so a missing file is reported as such rather than as a
    // polars read failure.
    open(path)?;

    let infer_rows = if source.infer_schema {
        Some(INFER_SCHEMA_ROWS)
    } else {
        Some(0)
    };

    let df = CsvReadOptions::default()
        .with_has_header(source.has_header)
        .with_infer_schema_length(infer_rows)
        .map_parse_options(|options| options.with_separator(source.delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|err| LoadError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;
    debug!(path = %path.display(), rows = df.height(), "Loaded CSV");
    Ok(df)
}

/// Sorted list of regular files matching `pattern`.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, LoadError> {
    let entries = glob(pattern).map_err(|err| LoadError::Pattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            LoadError::Open {
                path,
                source: err.into_error(),
            }
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reads every Parquet part file matching `pattern` as one logical table.
pub fn load_parquet_glob(pattern: &str) -> Result<DataFrame, LoadError> {
    let paths = expand_glob(pattern)?;
    if paths.is_empty() {
        return Err(LoadError::NoMatches(pattern.to_string()));
    }

    let mut combined: Option<DataFrame> = None;
    for path in &paths {
        let file = open(path)?;
        let part = ParquetReader::new(file)
            .finish()
            .map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), rows = part.height(), "Loaded parquet part");

        match combined.as_mut() {
            None => combined = Some(part),
            Some(existing) => {
                existing
                    .vstack_mut(&part)
                    .map_err(|source| LoadError::PartMismatch {
                        path: path.clone(),
                        source,
                    })?;
            }
        }
    }

    Ok(combined.unwrap_or_default())
}

/// Loads with `load` and checks the result against `schema`.
pub fn load_validated<F>(schema: &TableSchema, load: F) -> Result<DataFrame, LoadError>
where
    F: FnOnce() -> Result<DataFrame, LoadError>,
{
    let df = load()?;
    schema.validate(&df)?;
    Ok(df)
}
