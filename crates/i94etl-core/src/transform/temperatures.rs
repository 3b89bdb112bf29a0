use chrono::Datelike;
use polars::prelude::*;

use super::columns::{drop_columns, lowercase, string_column};
use super::TransformError;
use crate::dates::{day_of_week_sunday_first, parse_loose_date};
use crate::schema::{TEMPERATURES_SOURCE, USA_TEMP_OUTPUT};

pub const COUNTRY: &str = "United States";

/// Builds the USATEMP table from the by-state land temperature records.
///
/// Rows outside the United States or without a usable `AverageTemperature`
/// (null or NaN) are removed. `year`, `month` and `dayOfWeek` come from `dt`,
/// and `id` is `dt` with its dashes removed followed by the lower-cased state
/// name, so "1855-5-01" in Alabama becomes "1855501alabama".
pub fn build_usa_temperatures(raw: &DataFrame) -> Result<DataFrame, TransformError> {
    TEMPERATURES_SOURCE.validate(raw)?;

    let countries = string_column(raw, "Country")?;
    let averages = string_column(raw, "AverageTemperature")?;
    let keep: BooleanChunked = countries
        .into_iter()
        .zip(averages.into_iter())
        .map(|(country, average)| {
            country == Some(COUNTRY)
                && average.is_some_and(|value| {
                    let value = value.trim();
                    !value.is_empty() && !value.eq_ignore_ascii_case("nan")
                })
        })
        .collect();
    let mut temps = raw.filter(&keep)?;

    let dates = string_column(&temps, "dt")?;
    let states = lowercase(&string_column(&temps, "State")?);

    let mut years = Vec::with_capacity(temps.height());
    let mut months = Vec::with_capacity(temps.height());
    let mut weekdays = Vec::with_capacity(temps.height());
    let mut ids = Vec::with_capacity(temps.height());

    for (raw_date, state) in dates.into_iter().zip(states.iter()) {
        let parsed = raw_date.and_then(parse_loose_date);
        years.push(parsed.map(|date| date.year()));
        months.push(parsed.map(|date| date.month() as i32));
        weekdays.push(parsed.map(day_of_week_sunday_first));
        ids.push(match (raw_date, state) {
            (Some(raw_date), Some(state)) => Some(format!("{}{}", raw_date.replace('-', ""), state)),
            _ => None,
        });
    }

    let average = temps
        .column("AverageTemperature")?
        .cast(&DataType::Float64)?;
    temps.with_column(average)?;
    if temps.get_column_index("AverageTemperatureUncertainty").is_some() {
        let uncertainty = temps
            .column("AverageTemperatureUncertainty")?
            .cast(&DataType::Float64)?;
        temps.with_column(uncertainty)?;
    }

    temps.with_column(Series::new("State".into(), states))?;
    temps.with_column(Series::new("year".into(), years))?;
    temps.with_column(Series::new("month".into(), months))?;
    temps.with_column(Series::new("dayOfWeek".into(), weekdays))?;
    temps.with_column(Series::new("id".into(), ids))?;

    let temps = drop_columns(&temps, &["dt", "Country"])?;
    USA_TEMP_OUTPUT.validate(&temps)?;
    Ok(temps)
}
