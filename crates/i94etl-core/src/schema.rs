//! Declared column sets for every source dataset and every output table.
//!
//! Sources are checked right after loading and outputs right after their
//! transformer runs, so a renamed or missing column is reported once with the
//! full list of absent names instead of surfacing as a column lookup failure
//! deep inside a transformation.

use polars::prelude::DataFrame;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{dataset} is missing required columns: {missing:?}")]
    MissingColumns {
        dataset: &'static str,
        missing: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub dataset: &'static str,
    pub columns: &'static [&'static str],
}

impl TableSchema {
    pub fn validate(&self, df: &DataFrame) -> Result<(), SchemaError> {
        let present = df.get_column_names();
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|name| !present.iter().any(|column| column.as_str() == **name))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns {
                dataset: self.dataset,
                missing,
            })
        }
    }
}

pub const PORT_CODES_SOURCE: TableSchema = TableSchema {
    dataset: "port codes",
    columns: &["code", "name"],
};

pub const STATE_CODES_SOURCE: TableSchema = TableSchema {
    dataset: "state codes",
    columns: &["State", "Alpha code"],
};

pub const AIRPORT_CODES_SOURCE: TableSchema = TableSchema {
    dataset: "airport codes",
    columns: &[
        "ident",
        "type",
        "iso_country",
        "iso_region",
        "municipality",
        "coordinates",
    ],
};

pub const TEMPERATURES_SOURCE: TableSchema = TableSchema {
    dataset: "temperatures",
    columns: &["dt", "AverageTemperature", "Country", "State"],
};

pub const DEMOGRAPHICS_SOURCE: TableSchema = TableSchema {
    dataset: "city demographics",
    columns: &[
        "City",
        "State",
        "Median Age",
        "Male Population",
        "Female Population",
        "Total Population",
        "Number of Veterans",
        "Foreign-born",
        "Average Household Size",
        "State Code",
        "Race",
        "Count",
    ],
};

pub const IMMIGRATION_SOURCE: TableSchema = TableSchema {
    dataset: "immigration",
    columns: &["i94mode", "arrdate", "depdate"],
};

pub const PORT_CODES_OUTPUT: TableSchema = TableSchema {
    dataset: "portcodes",
    columns: &["port_code", "municipality", "statecode", "State"],
};

pub const AIRPORTS_OUTPUT: TableSchema = TableSchema {
    dataset: "airports",
    columns: &[
        "ident",
        "type",
        "iso_country",
        "municipality",
        "longitude",
        "latitude",
        "statecode",
    ],
};

pub const USA_TEMP_OUTPUT: TableSchema = TableSchema {
    dataset: "usatemp",
    columns: &[
        "id",
        "AverageTemperature",
        "State",
        "year",
        "month",
        "dayOfWeek",
    ],
};

pub const USA_DEMOGRAPHICS_OUTPUT: TableSchema = TableSchema {
    dataset: "usademographics",
    columns: &[
        "city",
        "state",
        "median_age",
        "male_population",
        "female_population",
        "total_population",
        "number_of_veterans",
        "foreign_born",
        "average_household_size",
        "state_code",
        "race",
        "count",
    ],
};

pub const IMMIGRATION_OUTPUT: TableSchema = TableSchema {
    dataset: "immigration",
    columns: &[
        "arrdate",
        "arrival_full",
        "arrival_day",
        "arrival_month",
        "arrival_year",
        "dep_day",
        "dep_month",
        "dep_year",
    ],
};
