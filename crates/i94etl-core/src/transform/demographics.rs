use polars::prelude::*;

use super::columns::{lowercase, rename_columns, string_column};
use super::TransformError;
use crate::schema::{DEMOGRAPHICS_SOURCE, USA_DEMOGRAPHICS_OUTPUT};

/// Source header -> warehouse column.
pub const COLUMN_RENAMES: [(&str, &str); 12] = [
    ("City", "city"),
    ("State", "state"),
    ("Median Age", "median_age"),
    ("Male Population", "male_population"),
    ("Female Population", "female_population"),
    ("Total Population", "total_population"),
    ("Number of Veterans", "number_of_veterans"),
    ("Foreign-born", "foreign_born"),
    ("Average Household Size", "average_household_size"),
    ("State Code", "state_code"),
    ("Race", "race"),
    ("Count", "count"),
];

const FLOAT_COLUMNS: [&str; 2] = ["median_age", "average_household_size"];
const INTEGER_COLUMNS: [&str; 6] = [
    "male_population",
    "female_population",
    "total_population",
    "number_of_veterans",
    "foreign_born",
    "count",
];

/// Normalizes the city demographics table: lower-cased city and state,
/// snake_case column names and numeric measures. Restricting the rows to
/// known port cities is done by [`crate::cross_filter::restrict_to_port_cities`].
pub fn build_demographics(raw: &DataFrame) -> Result<DataFrame, TransformError> {
    DEMOGRAPHICS_SOURCE.validate(raw)?;

    let mut demographics = raw.clone();
    let cities = lowercase(&string_column(raw, "City")?);
    let states = lowercase(&string_column(raw, "State")?);
    demographics.with_column(Series::new("City".into(), cities))?;
    demographics.with_column(Series::new("State".into(), states))?;

    rename_columns(&mut demographics, &COLUMN_RENAMES)?;

    for name in FLOAT_COLUMNS {
        let column = demographics.column(name)?.cast(&DataType::Float64)?;
        demographics.with_column(column)?;
    }
    for name in INTEGER_COLUMNS {
        let column = demographics.column(name)?.cast(&DataType::Int64)?;
        demographics.with_column(column)?;
    }

    USA_DEMOGRAPHICS_OUTPUT.validate(&demographics)?;
    Ok(demographics)
}
