//! Mapping between polars frames and warehouse relations.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use polars::prelude::{
    Column, DataFrame, DataType, NamedFrom, PolarsResult, Series, TimeUnit, TimeZone,
};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgColumn, PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::types::JsonValue;
use sqlx::{Column as _, Row, TypeInfo as _};
use uuid::Uuid;

use super::WarehouseError;
use crate::dates::{from_unix_days, to_unix_days};

/// PostgreSQL caps a statement at 65535 bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    Integer,
    BigInt,
    Double,
    Date,
    Text,
}

impl SqlType {
    pub fn for_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean => Self::Boolean,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::UInt8 | DataType::UInt16 => {
                Self::Integer
            }
            DataType::Int64 | DataType::UInt32 | DataType::UInt64 => Self::BigInt,
            DataType::Float32 | DataType::Float64 => Self::Double,
            DataType::Date => Self::Date,
            _ => Self::Text,
        }
    }

    pub fn ddl(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE PRECISION",
            Self::Date => "DATE",
            Self::Text => "TEXT",
        }
    }
}

/// Double-quoted identifier with embedded quotes escaped.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table_sql(destination: &str, columns: &[SqlColumn]) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|column| format!("{} {}", quote_ident(&column.name), column.sql_type.ddl()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(destination),
        definitions.join(", ")
    )
}

pub fn insert_prefix(destination: &str, columns: &[SqlColumn]) -> String {
    let names: Vec<String> = columns
        .iter()
        .map(|column| quote_ident(&column.name))
        .collect();
    format!(
        "INSERT INTO {} ({}) ",
        quote_ident(destination),
        names.join(", ")
    )
}

#[derive(Debug, Clone)]
pub enum SqlValues {
    Boolean(Vec<Option<bool>>),
    Integer(Vec<Option<i32>>),
    BigInt(Vec<Option<i64>>),
    Double(Vec<Option<f64>>),
    Date(Vec<Option<NaiveDate>>),
    Text(Vec<Option<String>>),
}

/// One frame column materialized as bindable values.
#[derive(Debug, Clone)]
pub struct SqlColumn {
    pub name: String,
    pub sql_type: SqlType,
    pub values: SqlValues,
}

impl SqlColumn {
    pub fn from_column(column: &Column) -> PolarsResult<Self> {
        let sql_type = SqlType::for_dtype(column.dtype());
        let values = match sql_type {
            SqlType::Boolean => {
                SqlValues::Boolean(column.cast(&DataType::Boolean)?.bool()?.into_iter().collect())
            }
            // Strict so an out-of-range unsigned value is an error, not a NULL.
            SqlType::Integer => SqlValues::Integer(
                column.strict_cast(&DataType::Int32)?.i32()?.into_iter().collect(),
            ),
            SqlType::BigInt => SqlValues::BigInt(
                column.strict_cast(&DataType::Int64)?.i64()?.into_iter().collect(),
            ),
            SqlType::Double => {
                SqlValues::Double(column.cast(&DataType::Float64)?.f64()?.into_iter().collect())
            }
            SqlType::Date => SqlValues::Date(
                column
                    .cast(&DataType::Int32)?
                    .i32()?
                    .into_iter()
                    .map(|days| days.and_then(from_unix_days))
                    .collect(),
            ),
            SqlType::Text => SqlValues::Text(
                column
                    .cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|value| value.map(str::to_string))
                    .collect(),
            ),
        };

        Ok(Self {
            name: column.name().to_string(),
            sql_type,
            values,
        })
    }

    pub fn push_bind<'qb, 'args: 'qb>(
        &self,
        row: &mut Separated<'qb, 'args, Postgres, &'static str>,
        idx: usize,
    ) {
        match &self.values {
            SqlValues::Boolean(values) => {
                row.push_bind(values[idx]);
            }
            SqlValues::Integer(values) => {
                row.push_bind(values[idx]);
            }
            SqlValues::BigInt(values) => {
                row.push_bind(values[idx]);
            }
            SqlValues::Double(values) => {
                row.push_bind(values[idx]);
            }
            SqlValues::Date(values) => {
                row.push_bind(values[idx]);
            }
            SqlValues::Text(values) => {
                row.push_bind(values[idx].clone());
            }
        }
    }
}

pub fn sql_columns(df: &DataFrame) -> PolarsResult<Vec<SqlColumn>> {
    df.get_columns().iter().map(SqlColumn::from_column).collect()
}

/// Rows per INSERT statement for a table of `column_count` columns.
pub fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).max(1)
}

fn decode_all<'r, T>(rows: &'r [PgRow], idx: usize) -> Result<Vec<Option<T>>, sqlx::Error>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    rows.iter()
        .map(|row| row.try_get::<Option<T>, _>(idx))
        .collect()
}

fn decode_mapped<'r, T, U, F>(rows: &'r [PgRow], idx: usize, f: F) -> Result<Vec<Option<U>>, sqlx::Error>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    F: Fn(T) -> U,
{
    Ok(decode_all::<T>(rows, idx)?
        .into_iter()
        .map(|value| value.map(&f))
        .collect())
}

/// Raw values read as UTF-8 text, for result types without a dedicated
/// mapping.
fn decode_as_text(
    rows: &[PgRow],
    idx: usize,
    column: &str,
    type_name: &str,
) -> Result<Vec<Option<String>>, WarehouseError> {
    rows.iter()
        .map(|row| row.try_get_unchecked::<Option<String>, _>(idx))
        .collect::<Result<_, _>>()
        .map_err(|_| WarehouseError::UnsupportedColumnType {
            column: column.to_string(),
            type_name: type_name.to_string(),
        })
}

pub fn interval_text(interval: &PgInterval) -> String {
    let total_seconds = interval.microseconds / 1_000_000;
    let micros = (interval.microseconds % 1_000_000).abs();
    let sign = if interval.microseconds < 0 { "-" } else { "" };
    let seconds = total_seconds.abs();
    let clock = format!(
        "{sign}{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    );
    let clock = if micros == 0 {
        clock
    } else {
        format!("{clock}.{micros:06}")
    };
    format!("{} mons {} days {clock}", interval.months, interval.days)
}

fn decode_column(
    name: &str,
    type_name: &str,
    rows: &[PgRow],
    idx: usize,
) -> Result<Series, WarehouseError> {
    let series = match type_name {
        "BOOL" => Series::new(name.into(), decode_all::<bool>(rows, idx)?),
        "INT2" => Series::new(name.into(), decode_mapped(rows, idx, |value: i16| i32::from(value))?),
        "INT4" => Series::new(name.into(), decode_all::<i32>(rows, idx)?),
        "INT8" => Series::new(name.into(), decode_all::<i64>(rows, idx)?),
        "FLOAT4" => Series::new(name.into(), decode_mapped(rows, idx, |value: f32| f64::from(value))?),
        "FLOAT8" => Series::new(name.into(), decode_all::<f64>(rows, idx)?),
        "NUMERIC" => Series::new(
            name.into(),
            decode_all::<BigDecimal>(rows, idx)?
                .into_iter()
                .map(|value| value.and_then(|value| value.to_f64()))
                .collect::<Vec<_>>(),
        ),
        "DATE" => Series::new(name.into(), decode_mapped(rows, idx, to_unix_days)?)
            .cast(&DataType::Date)?,
        "TIMESTAMP" => Series::new(
            name.into(),
            decode_mapped(rows, idx, |value: NaiveDateTime| value.and_utc().timestamp_micros())?,
        )
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?,
        "TIMESTAMPTZ" => Series::new(
            name.into(),
            decode_mapped(rows, idx, |value: DateTime<Utc>| value.timestamp_micros())?,
        )
        .cast(&DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC)))?,
        "TIME" => Series::new(name.into(), decode_mapped(rows, idx, |value: NaiveTime| value.to_string())?),
        "INTERVAL" => Series::new(
            name.into(),
            decode_mapped(rows, idx, |value: PgInterval| interval_text(&value))?,
        ),
        "UUID" => Series::new(name.into(), decode_mapped(rows, idx, |value: Uuid| value.to_string())?),
        "JSON" | "JSONB" => Series::new(
            name.into(),
            decode_mapped(rows, idx, |value: JsonValue| value.to_string())?,
        ),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => {
            Series::new(name.into(), decode_all::<String>(rows, idx)?)
        }
        other => Series::new(name.into(), decode_as_text(rows, idx, name, other)?),
    };
    Ok(series)
}

/// Builds a frame from a query result. `columns` describes the result set, so
/// an empty result still yields correctly named and typed columns.
pub fn frame_from_rows(columns: &[PgColumn], rows: &[PgRow]) -> Result<DataFrame, WarehouseError> {
    let mut frame_columns: Vec<Column> = Vec::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        let series = decode_column(column.name(), column.type_info().name(), rows, idx)?;
        frame_columns.push(series.into());
    }
    Ok(DataFrame::new(frame_columns)?)
}
