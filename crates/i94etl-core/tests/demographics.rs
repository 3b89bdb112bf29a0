use polars::prelude::*;

use i94etl_core::cross_filter::restrict_to_port_cities;
use i94etl_core::transform::build_demographics;

fn raw_demographics() -> PolarsResult<DataFrame> {
    df!(
        "City" => ["Birmingham", "Birmingham", "Anchorage", "Hoover", "Nogales"],
        "State" => ["Alabama", "Alabama", "Alaska", "Alabama", "Texas"],
        "Median Age" => ["35.6", "35.6", "32.2", "38.5", "30.0"],
        "Male Population" => ["102122", "102122", "152945", "38040", "1000"],
        "Female Population" => ["112789", "112789", "145750", "46799", "1000"],
        "Total Population" => ["214911", "214911", "298695", "84839", "2000"],
        "Number of Veterans" => ["13212", "13212", "27492", "4819", "10"],
        "Foreign-born" => ["8258", "8258", "33258", "8229", "10"],
        "Average Household Size" => ["2.4", "2.4", "2.77", "2.58", "3.0"],
        "State Code" => ["AL", "AL", "AK", "AL", "TX"],
        "Race" => ["Black or African-American", "White", "White", "White", "White"],
        "Count" => ["157985", "51728", "198894", "64633", "2000"]
    )
}

#[test]
fn demographics_are_renamed_lowercased_and_typed() -> anyhow::Result<()> {
    let table = build_demographics(&raw_demographics()?)?;

    let names: Vec<&str> = table
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
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
        ]
    );

    let cities: Vec<&str> = table.column("city")?.str()?.into_no_null_iter().collect();
    assert_eq!(cities[0], "birmingham");
    let states: Vec<&str> = table.column("state")?.str()?.into_no_null_iter().collect();
    assert_eq!(states[2], "alaska");

    assert_eq!(table.column("median_age")?.dtype(), &DataType::Float64);
    assert_eq!(table.column("count")?.dtype(), &DataType::Int64);
    assert_eq!(table.column("total_population")?.i64()?.get(2), Some(298695));
    // State codes keep their case; they are matched against port state codes.
    assert_eq!(table.column("state_code")?.str()?.get(0), Some("AL"));
    Ok(())
}

#[test]
fn demographics_restricted_to_port_cities_without_duplication() -> anyhow::Result<()> {
    let demographics = build_demographics(&raw_demographics()?)?;
    // Two ports serve Birmingham; the join must not multiply its rows.
    let ports = df!(
        "port_code" => ["BIR", "BHM", "ANC", "NOG"],
        "municipality" => [Some("birmingham"), Some("birmingham"), Some("anchorage"), Some("nogales")],
        "statecode" => [Some("AL"), Some("AL"), Some("AK"), Some("AZ")],
        "State" => [Some("alabama"), Some("alabama"), Some("alaska"), Some("arizona")]
    )?;

    let filtered = restrict_to_port_cities(&demographics, &ports)?;
    assert_eq!(filtered.height(), 3);
    assert_eq!(filtered.width(), demographics.width());

    let mut keys: Vec<(&str, &str)> = filtered
        .column("city")?
        .str()?
        .into_no_null_iter()
        .zip(filtered.column("race")?.str()?.into_no_null_iter())
        .collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            ("anchorage", "White"),
            ("birmingham", "Black or African-American"),
            ("birmingham", "White"),
        ]
    );

    let cities: Vec<&str> = filtered.column("city")?.str()?.into_no_null_iter().collect();
    assert!(!cities.contains(&"hoover"));
    // Nogales exists as a port, but in Arizona rather than Texas.
    assert!(!cities.contains(&"nogales"));
    Ok(())
}

#[test]
fn null_keys_never_match() -> anyhow::Result<()> {
    let demographics = df!(
        "city" => [None, Some("mobile")],
        "state_code" => [Some("AL"), None::<&str>]
    )?;
    let ports = df!(
        "municipality" => [None, Some("mobile")],
        "statecode" => [Some("AL"), Some("AL")]
    )?;

    let filtered = restrict_to_port_cities(&demographics, &ports)?;
    assert_eq!(filtered.height(), 0);
    Ok(())
}
