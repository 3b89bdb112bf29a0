use polars::prelude::*;

use super::columns::{deduplicate, drop_columns, lowercase, split_part, string_column};
use super::TransformError;
use crate::schema::{PORT_CODES_OUTPUT, PORT_CODES_SOURCE, STATE_CODES_SOURCE};

/// Port names containing any of these markers are placeholders, not ports.
pub const EXCLUDED_NAME_MARKERS: [&str; 2] = ["No PORT", "Collapsed"];

const STATE_NAME: &str = "State";
const STATE_ALPHA_CODE: &str = "Alpha code";

/// Builds the PORTCODES table from the raw port list (`code`, `name`) and the
/// state code reference table (`State`, `Alpha code`).
///
/// `name` is "MUNICIPALITY, ST"; the municipality is lower-cased and the state
/// code upper-cased, both trimmed. Ports whose second field is not a two-letter
/// code are dropped, and the full state name is attached with a left join so
/// ports with an unknown code keep a null `State`.
pub fn build_port_codes(ports: &DataFrame, states: &DataFrame) -> Result<DataFrame, TransformError> {
    PORT_CODES_SOURCE.validate(ports)?;
    STATE_CODES_SOURCE.validate(states)?;

    let names = string_column(ports, "name")?;
    let keep: BooleanChunked = names
        .into_iter()
        .map(|name| {
            name.is_some_and(|name| {
                !EXCLUDED_NAME_MARKERS
                    .iter()
                    .any(|marker| name.contains(marker))
            })
        })
        .collect();
    let mut ports = deduplicate(&ports.filter(&keep)?)?;

    let names = string_column(&ports, "name")?;
    let municipality: Vec<Option<String>> = names
        .into_iter()
        .map(|name| {
            name.and_then(|name| split_part(name, ',', 0))
                .map(|part| part.to_lowercase().trim().to_string())
        })
        .collect();
    let statecode: Vec<Option<String>> = names
        .into_iter()
        .map(|name| name.and_then(derive_state_code))
        .collect();

    ports.with_column(Series::new("municipality".into(), municipality))?;
    ports.with_column(Series::new("statecode".into(), statecode))?;

    let has_state = ports.column("statecode")?.is_not_null();
    let mut ports = drop_columns(&ports.filter(&has_state)?, &["name"])?;
    ports.rename("code", "port_code".into())?;

    let reference = DataFrame::new(vec![
        string_column(states, STATE_NAME)?.into_series().into(),
        string_column(states, STATE_ALPHA_CODE)?.into_series().into(),
    ])?;

    let joined = ports
        .lazy()
        .join(
            reference.lazy(),
            [col("statecode")],
            [col(STATE_ALPHA_CODE)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;
    let mut joined = drop_columns(&joined, &[STATE_ALPHA_CODE])?;

    let state_names = lowercase(&string_column(&joined, STATE_NAME)?);
    joined.with_column(Series::new(STATE_NAME.into(), state_names))?;

    PORT_CODES_OUTPUT.validate(&joined)?;
    Ok(joined)
}

/// Upper-cased second comma field of a port name, when it is a two-letter code.
pub fn derive_state_code(name: &str) -> Option<String> {
    let code = split_part(name, ',', 1)?.trim().to_uppercase();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())).then_some(code)
}
