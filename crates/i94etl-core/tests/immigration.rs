use chrono::NaiveDate;
use polars::prelude::*;

use i94etl_core::dates::to_unix_days;
use i94etl_core::transform::build_immigration;

fn raw_immigration() -> PolarsResult<DataFrame> {
    df!(
        "cicid" => [6.0f64, 7.0, 15.0, 16.0],
        "i94mode" => [Some(1.0f64), Some(2.0), Some(1.0), None],
        "arrdate" => [Some(20545.0f64), Some(20545.0), Some(0.0), Some(20550.0)],
        "depdate" => [Some(20550.0f64), Some(20560.0), None, Some(20551.0)],
        "count" => [1.0f64, 1.0, 1.0, 1.0],
        "admnum" => [1.0f64, 2.0, 3.0, 4.0],
        "entdepa" => ["G", "G", "T", "G"],
        "matflag" => [Some("M"), Some("M"), None, Some("M")],
        "visatype" => ["B2", "WT", "B1", "F1"]
    )
}

#[test]
fn immigration_keeps_only_air_arrivals() -> anyhow::Result<()> {
    let table = build_immigration(&raw_immigration()?)?;
    assert_eq!(table.height(), 2);

    let visas: Vec<&str> = table.column("visatype")?.str()?.into_no_null_iter().collect();
    assert_eq!(visas, vec!["B2", "B1"]);
    Ok(())
}

#[test]
fn immigration_dates_are_offsets_from_1960() -> anyhow::Result<()> {
    let table = build_immigration(&raw_immigration()?)?;

    let arrdate: Vec<Option<i32>> = table.column("arrdate")?.i32()?.into_iter().collect();
    assert_eq!(arrdate, vec![Some(20545), Some(0)]);

    let full = table.column("arrival_full")?;
    assert_eq!(full.dtype(), &DataType::Date);
    let days: Vec<Option<i32>> = full.cast(&DataType::Int32)?.i32()?.into_iter().collect();
    let expected = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).map(to_unix_days);
    assert_eq!(days, vec![expected(2016, 4, 1), expected(1960, 1, 1)]);

    let parts = |name: &str| -> PolarsResult<Vec<Option<i32>>> {
        Ok(table.column(name)?.i32()?.into_iter().collect())
    };
    assert_eq!(parts("arrival_year")?, vec![Some(2016), Some(1960)]);
    assert_eq!(parts("arrival_month")?, vec![Some(4), Some(1)]);
    assert_eq!(parts("arrival_day")?, vec![Some(1), Some(1)]);
    assert_eq!(parts("dep_year")?, vec![Some(2016), None]);
    assert_eq!(parts("dep_month")?, vec![Some(4), None]);
    assert_eq!(parts("dep_day")?, vec![Some(6), None]);
    Ok(())
}

#[test]
fn immigration_drops_administrative_columns() -> anyhow::Result<()> {
    let table = build_immigration(&raw_immigration()?)?;
    let names: Vec<&str> = table
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();

    for dropped in ["depdate", "i94mode", "count", "admnum", "entdepa", "matflag"] {
        assert!(!names.contains(&dropped), "{dropped} should be dropped");
    }
    for kept in ["cicid", "arrdate", "arrival_full", "visatype"] {
        assert!(names.contains(&kept), "{kept} should be kept");
    }
    Ok(())
}

#[test]
fn string_offsets_with_fractions_are_truncated() -> anyhow::Result<()> {
    let raw = df!(
        "i94mode" => ["1", "1"],
        "arrdate" => ["20545.0", "20546.7"],
        "depdate" => [Some("20547.0"), None]
    )?;

    let table = build_immigration(&raw)?;
    let arrdate: Vec<Option<i32>> = table.column("arrdate")?.i32()?.into_iter().collect();
    assert_eq!(arrdate, vec![Some(20545), Some(20546)]);
    Ok(())
}
