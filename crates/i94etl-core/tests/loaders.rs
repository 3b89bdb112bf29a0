use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use polars::prelude::*;
use tempfile::tempdir;

use i94etl_core::loaders::{
    expand_glob, load_csv, load_json_lines, load_parquet_glob, load_validated, CsvSource,
    LoadError,
};
use i94etl_core::schema::{DEMOGRAPHICS_SOURCE, PORT_CODES_SOURCE, TEMPERATURES_SOURCE};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn write_part(path: &Path, modes: &[f64]) -> Result<()> {
    let arrivals: Vec<f64> = modes.iter().map(|_| 20545.0).collect();
    let mut part = df!(
        "i94mode" => modes,
        "arrdate" => arrivals.clone(),
        "depdate" => arrivals
    )?;
    ParquetWriter::new(File::create(path)?).finish(&mut part)?;
    Ok(())
}

#[test]
fn json_lines_become_one_row_per_record() -> Result<()> {
    let ports = load_json_lines(&fixture("port_codes.json"))?;
    assert_eq!(ports.height(), 12);
    PORT_CODES_SOURCE.validate(&ports)?;
    Ok(())
}

#[test]
fn csv_without_inference_reads_strings() -> Result<()> {
    let airports = load_csv(&fixture("airport_codes.csv"), CsvSource::default())?;
    assert_eq!(airports.height(), 7);
    assert_eq!(airports.column("elevation_ft")?.dtype(), &DataType::String);
    // Quoted coordinates keep their embedded comma.
    assert_eq!(
        airports.column("coordinates")?.str()?.get(1),
        Some("-101.473911, 38.704022")
    );
    Ok(())
}

#[test]
fn csv_with_inference_types_numeric_columns() -> Result<()> {
    let temps = load_csv(
        &fixture("temperatures.csv"),
        CsvSource::default().with_inferred_schema(),
    )?;
    TEMPERATURES_SOURCE.validate(&temps)?;
    assert!(temps.column("AverageTemperatureUncertainty")?.dtype().is_float());
    Ok(())
}

#[test]
fn semicolon_delimited_csv() -> Result<()> {
    let demographics = load_csv(
        &fixture("demographics.csv"),
        CsvSource::default().with_delimiter(b';'),
    )?;
    DEMOGRAPHICS_SOURCE.validate(&demographics)?;
    assert_eq!(demographics.height(), 6);
    assert_eq!(demographics.width(), 12);
    Ok(())
}

#[test]
fn missing_file_is_an_open_error() {
    let err = load_csv(&fixture("does_not_exist.csv"), CsvSource::default()).unwrap_err();
    assert!(matches!(err, LoadError::Open { .. }), "{err}");
}

#[test]
fn parquet_parts_are_combined_in_name_order() -> Result<()> {
    let dir = tempdir()?;
    write_part(&dir.path().join("part-00001.snappy.parquet"), &[2.0, 3.0])?;
    write_part(&dir.path().join("part-00000.snappy.parquet"), &[1.0])?;
    std::fs::write(dir.path().join("_SUCCESS"), b"")?;

    let pattern = format!("{}/*.snappy.parquet", dir.path().display());
    let parts = expand_glob(&pattern)?;
    assert_eq!(parts.len(), 2);
    assert!(parts[0].ends_with("part-00000.snappy.parquet"));

    let combined = load_parquet_glob(&pattern)?;
    let modes: Vec<Option<f64>> = combined.column("i94mode")?.f64()?.into_iter().collect();
    assert_eq!(modes, vec![Some(1.0), Some(2.0), Some(3.0)]);
    Ok(())
}

#[test]
fn empty_glob_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let pattern = format!("{}/*.parquet", dir.path().display());
    let err = load_parquet_glob(&pattern).unwrap_err();
    assert!(matches!(err, LoadError::NoMatches(_)), "{err}");
    Ok(())
}

#[test]
fn validation_failure_names_the_missing_columns() {
    let err = load_validated(&TEMPERATURES_SOURCE, || {
        load_csv(&fixture("state_codes.csv"), CsvSource::default())
    })
    .unwrap_err();
    match err {
        LoadError::Schema(schema) => assert!(schema.to_string().contains("AverageTemperature")),
        other => panic!("unexpected error: {other}"),
    }
}
