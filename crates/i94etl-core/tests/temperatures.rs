use polars::prelude::*;

use i94etl_core::transform::build_usa_temperatures;

#[test]
fn temperature_ids_strip_dashes_and_append_state() -> anyhow::Result<()> {
    let raw = df!(
        "dt" => ["1855-5-01", "2013-09-01"],
        "AverageTemperature" => [Some(25.544f64), Some(16.583)],
        "AverageTemperatureUncertainty" => [Some(1.171f64), None],
        "State" => ["Alabama", "New York"],
        "Country" => ["United States", "United States"]
    )?;

    let table = build_usa_temperatures(&raw)?;
    let ids: Vec<&str> = table.column("id")?.str()?.into_no_null_iter().collect();
    assert_eq!(ids, vec!["1855501alabama", "20130901new york"]);

    let states: Vec<&str> = table.column("State")?.str()?.into_no_null_iter().collect();
    assert_eq!(states, vec!["alabama", "new york"]);

    let years: Vec<Option<i32>> = table.column("year")?.i32()?.into_iter().collect();
    let months: Vec<Option<i32>> = table.column("month")?.i32()?.into_iter().collect();
    let weekdays: Vec<Option<i32>> = table.column("dayOfWeek")?.i32()?.into_iter().collect();
    assert_eq!(years, vec![Some(1855), Some(2013)]);
    assert_eq!(months, vec![Some(5), Some(9)]);
    // 1855-05-01 was a Tuesday and 2013-09-01 a Sunday.
    assert_eq!(weekdays, vec![Some(3), Some(1)]);

    let names: Vec<&str> = table
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    assert!(!names.contains(&"dt"));
    assert!(!names.contains(&"Country"));
    Ok(())
}

#[test]
fn temperatures_outside_the_us_or_without_readings_are_removed() -> anyhow::Result<()> {
    let raw = df!(
        "dt" => ["1855-05-01", "1855-06-01", "1855-07-01", "1855-05-01"],
        "AverageTemperature" => [Some("25.544"), None, Some("NaN"), Some("9.207")],
        "State" => ["Alabama", "Alabama", "Alabama", "Acre"],
        "Country" => ["United States", "United States", "United States", "Brazil"]
    )?;

    let table = build_usa_temperatures(&raw)?;
    assert_eq!(table.height(), 1);

    let average = table.column("AverageTemperature")?;
    assert_eq!(average.dtype(), &DataType::Float64);
    let value = average.f64()?.get(0);
    assert_eq!(value, Some(25.544));
    Ok(())
}
