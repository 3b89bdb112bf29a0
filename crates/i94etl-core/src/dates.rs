use chrono::{Datelike, Duration, NaiveDate};

/// Reference date of the immigration day offsets.
pub fn sas_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1960, 1, 1).expect("1960-01-01 is a valid date")
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("1970-01-01 is a valid date")
}

/// Calendar date `offset` days after 1960-01-01.
pub fn date_from_epoch_offset(offset: i32) -> Option<NaiveDate> {
    sas_epoch().checked_add_signed(Duration::days(i64::from(offset)))
}

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub fn to_unix_days(date: NaiveDate) -> i32 {
    (date - unix_epoch()).num_days() as i32
}

pub fn from_unix_days(days: i32) -> Option<NaiveDate> {
    unix_epoch().checked_add_signed(Duration::days(i64::from(days)))
}

/// 1 = Sunday through 7 = Saturday.
pub fn day_of_week_sunday_first(date: NaiveDate) -> i32 {
    date.weekday().number_from_sunday() as i32
}

/// Parses `Y-M-D` with unpadded month/day (`1855-5-01`); anything after the
/// date part (`T..` or a space-separated time) is ignored.
pub fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw
        .trim()
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()?;
    let mut parts = date_part.split('-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Integer part of a numeric string such as `"20545.0"`; everything from the
/// first `.` is discarded before parsing.
pub fn parse_truncated_int(raw: &str) -> Option<i32> {
    let integral = match raw.find('.') {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    integral.trim().parse::<i32>().ok()
}
