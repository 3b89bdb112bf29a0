use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use super::columns::{drop_columns, string_column};
use super::TransformError;
use crate::dates::{date_from_epoch_offset, parse_truncated_int, to_unix_days};
use crate::schema::{IMMIGRATION_OUTPUT, IMMIGRATION_SOURCE};

/// `i94mode` value for arrivals by air.
pub const AIR_TRAVEL_MODE: f64 = 1.0;

pub const DROPPED_COLUMNS: [&str; 9] = [
    "depdate", "i94mode", "count", "admnum", "entdepa", "entdepd", "entdepu", "matflag", "insnum",
];

struct DateParts {
    day: Vec<Option<i32>>,
    month: Vec<Option<i32>>,
    year: Vec<Option<i32>>,
}

impl DateParts {
    fn from_dates(dates: &[Option<NaiveDate>]) -> Self {
        Self {
            day: dates.iter().map(|d| d.map(|d| d.day() as i32)).collect(),
            month: dates.iter().map(|d| d.map(|d| d.month() as i32)).collect(),
            year: dates.iter().map(|d| d.map(|d| d.year())).collect(),
        }
    }
}

/// Builds the IMMIGRATION table from the I-94 arrival records.
///
/// Only air arrivals are kept. `arrdate` and `depdate` hold day offsets from
/// 1960-01-01, sometimes written with a fractional part ("20545.0"); the
/// fraction is discarded, `arrdate` is stored as that integer, and both are
/// expanded into calendar parts. Administrative columns are dropped.
pub fn build_immigration(raw: &DataFrame) -> Result<DataFrame, TransformError> {
    IMMIGRATION_SOURCE.validate(raw)?;

    let modes = raw.column("i94mode")?.cast(&DataType::Float64)?;
    let keep: BooleanChunked = modes
        .f64()?
        .into_iter()
        .map(|mode| mode == Some(AIR_TRAVEL_MODE))
        .collect();
    let mut immigration = raw.filter(&keep)?;

    let arrival_offsets = day_offsets(&immigration, "arrdate")?;
    let departure_offsets = day_offsets(&immigration, "depdate")?;

    let arrival_dates: Vec<Option<NaiveDate>> = arrival_offsets
        .iter()
        .map(|offset| offset.and_then(date_from_epoch_offset))
        .collect();
    let departure_dates: Vec<Option<NaiveDate>> = departure_offsets
        .iter()
        .map(|offset| offset.and_then(date_from_epoch_offset))
        .collect();

    let arrival_full = Series::new(
        "arrival_full".into(),
        arrival_dates
            .iter()
            .map(|date| date.map(to_unix_days))
            .collect::<Vec<Option<i32>>>(),
    )
    .cast(&DataType::Date)?;

    let arrival = DateParts::from_dates(&arrival_dates);
    let departure = DateParts::from_dates(&departure_dates);

    immigration.with_column(Series::new("arrdate".into(), arrival_offsets))?;
    immigration.with_column(Series::new("depdate".into(), departure_offsets))?;
    immigration.with_column(arrival_full)?;
    immigration.with_column(Series::new("arrival_day".into(), arrival.day))?;
    immigration.with_column(Series::new("arrival_month".into(), arrival.month))?;
    immigration.with_column(Series::new("arrival_year".into(), arrival.year))?;
    immigration.with_column(Series::new("dep_day".into(), departure.day))?;
    immigration.with_column(Series::new("dep_month".into(), departure.month))?;
    immigration.with_column(Series::new("dep_year".into(), departure.year))?;

    let immigration = drop_columns(&immigration, &DROPPED_COLUMNS)?;
    IMMIGRATION_OUTPUT.validate(&immigration)?;
    Ok(immigration)
}

fn day_offsets(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i32>>> {
    let values = string_column(df, name)?;
    Ok(values
        .into_iter()
        .map(|value| value.and_then(parse_truncated_int))
        .collect())
}
