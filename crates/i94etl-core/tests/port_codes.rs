use std::collections::HashMap;

use polars::prelude::*;

use i94etl_core::transform::build_port_codes;

type PortRow = (Option<String>, Option<String>, Option<String>);

fn strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

fn rows_by_code(df: &DataFrame) -> PolarsResult<HashMap<String, PortRow>> {
    let codes = strings(df, "port_code")?;
    let municipalities = strings(df, "municipality")?;
    let statecodes = strings(df, "statecode")?;
    let states = strings(df, "State")?;

    let mut rows = HashMap::new();
    for (idx, code) in codes.into_iter().enumerate() {
        rows.insert(
            code.unwrap_or_default(),
            (
                municipalities[idx].clone(),
                statecodes[idx].clone(),
                states[idx].clone(),
            ),
        );
    }
    Ok(rows)
}

fn states() -> PolarsResult<DataFrame> {
    df!(
        "State" => ["Alabama", "Alaska", "Arizona"],
        "Abbrev" => ["Ala.", "Alaska", "Ariz."],
        "Alpha code" => ["AL", "AK", "AZ"]
    )
}

#[test]
fn port_codes_split_names_and_attach_state() -> anyhow::Result<()> {
    let ports = df!(
        "code" => ["ALC", "BIR", "NOG", "NYC"],
        "name" => ["ALCAN, AK", "BIRMINGHAM, AL", " Nogales ,az", "NEW YORK, NY"]
    )?;

    let table = build_port_codes(&ports, &states()?)?;
    let names: Vec<&str> = table
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    for expected in ["port_code", "municipality", "statecode", "State"] {
        assert!(names.contains(&expected), "missing column {expected}");
    }
    assert!(!names.contains(&"name"));
    assert!(!names.contains(&"Alpha code"));

    let rows = rows_by_code(&table)?;
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows["ALC"],
        (
            Some("alcan".to_string()),
            Some("AK".to_string()),
            Some("alaska".to_string())
        )
    );
    assert_eq!(
        rows["NOG"],
        (
            Some("nogales".to_string()),
            Some("AZ".to_string()),
            Some("arizona".to_string())
        )
    );
    // NY is not in the reference table; the port survives without a state name.
    assert_eq!(
        rows["NYC"],
        (Some("new york".to_string()), Some("NY".to_string()), None)
    );
    Ok(())
}

#[test]
fn placeholder_and_malformed_ports_are_removed() -> anyhow::Result<()> {
    let ports = df!(
        "code" => ["XNA", "ZZZ", "MAA", "CLG", "ANC"],
        "name" => [
            "No PORT Code (XNA)",
            "Collapsed (BUF) - removed, NY",
            "MARIPOSA AZ",
            "CALGARY, CANADA",
            "ANCHORAGE, AK"
        ]
    )?;

    let table = build_port_codes(&ports, &states()?)?;
    let rows = rows_by_code(&table)?;
    assert_eq!(rows.len(), 1);
    assert!(rows.contains_key("ANC"));
    Ok(())
}

#[test]
fn duplicate_ports_appear_once() -> anyhow::Result<()> {
    let ports = df!(
        "code" => ["ANC", "ANC", "ALC"],
        "name" => ["ANCHORAGE, AK", "ANCHORAGE, AK", "ALCAN, AK"]
    )?;

    let table = build_port_codes(&ports, &states()?)?;
    assert_eq!(table.height(), 2);
    Ok(())
}

#[test]
fn every_state_code_has_two_characters() -> anyhow::Result<()> {
    let ports = df!(
        "code" => ["A", "B", "C", "D"],
        "name" => ["ONE, AK", "TWO, ALASKA", "THREE,", "FOUR, A1"]
    )?;

    let table = build_port_codes(&ports, &states()?)?;
    for code in strings(&table, "statecode")? {
        assert_eq!(code.map(|code| code.len()), Some(2));
    }
    assert_eq!(table.height(), 1);
    Ok(())
}

#[test]
fn missing_name_column_is_a_schema_error() -> anyhow::Result<()> {
    let ports = df!("code" => ["ALC"])?;
    let err = build_port_codes(&ports, &states()?).unwrap_err();
    assert!(err.to_string().contains("name"), "{err}");
    Ok(())
}
