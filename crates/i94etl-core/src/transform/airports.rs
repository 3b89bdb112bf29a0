use polars::prelude::*;

use super::columns::{drop_columns, lowercase, map_strings, split_part, string_column};
use super::TransformError;
use crate::schema::{AIRPORTS_OUTPUT, AIRPORT_CODES_SOURCE};

pub const EXCLUDED_TYPES: [&str; 2] = ["heliport", "closed"];

/// Columns replaced by derived ones or outside the analysis.
pub const DROPPED_COLUMNS: [&str; 5] = [
    "iso_region",
    "continent",
    "coordinates",
    "gps_code",
    "local_code",
];

/// Builds the AIRPORTS table: US airports only, heliports and closed sites
/// removed, `coordinates` split into `longitude`/`latitude` and the state code
/// taken from `iso_region` ("US-PA" -> "PA").
pub fn build_airports(raw: &DataFrame) -> Result<DataFrame, TransformError> {
    AIRPORT_CODES_SOURCE.validate(raw)?;

    let countries = string_column(raw, "iso_country")?;
    let types = string_column(raw, "type")?;
    let keep: BooleanChunked = countries
        .into_iter()
        .zip(types.into_iter())
        .map(|(country, kind)| match (country, kind) {
            (Some(country), Some(kind)) => country == "US" && !EXCLUDED_TYPES.contains(&kind),
            _ => false,
        })
        .collect();
    let mut airports = raw.filter(&keep)?;

    let coordinates = string_column(&airports, "coordinates")?;
    let longitude = map_strings(&coordinates, |value| {
        split_part(value, ',', 0).map(|part| part.trim().to_string())
    });
    let latitude = map_strings(&coordinates, |value| {
        split_part(value, ',', 1).map(|part| part.trim().to_string())
    });

    let regions = string_column(&airports, "iso_region")?;
    let statecode = map_strings(&regions, |value| {
        split_part(value, '-', 1).map(|part| part.to_uppercase())
    });

    let municipality = lowercase(&string_column(&airports, "municipality")?);

    airports.with_column(Series::new("longitude".into(), longitude))?;
    airports.with_column(Series::new("latitude".into(), latitude))?;
    airports.with_column(Series::new("statecode".into(), statecode))?;
    airports.with_column(Series::new("municipality".into(), municipality))?;

    let airports = drop_columns(&airports, &DROPPED_COLUMNS)?;
    AIRPORTS_OUTPUT.validate(&airports)?;
    Ok(airports)
}
