use polars::prelude::*;

/// `name` cast to strings, so callers can iterate `Option<&str>` regardless
/// of the inferred source type.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> PolarsResult<StringChunked> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.clone())
}

/// Field `index` of `value` split on `delimiter`; `None` when there are fewer
/// fields.
pub(crate) fn split_part(value: &str, delimiter: char, index: usize) -> Option<&str> {
    value.split(delimiter).nth(index)
}

pub(crate) fn map_strings<F>(values: &StringChunked, f: F) -> Vec<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    values.into_iter().map(|value| value.and_then(&f)).collect()
}

pub(crate) fn lowercase(values: &StringChunked) -> Vec<Option<String>> {
    map_strings(values, |value| Some(value.to_lowercase()))
}

/// Drops every listed column that exists; absent names are ignored.
pub fn drop_columns(df: &DataFrame, names: &[&str]) -> PolarsResult<DataFrame> {
    let keep: Vec<PlSmallStr> = df
        .get_column_names()
        .into_iter()
        .filter(|column| !names.contains(&column.as_str()))
        .cloned()
        .collect();
    df.select(keep)
}

pub fn rename_columns(df: &mut DataFrame, renames: &[(&str, &str)]) -> PolarsResult<()> {
    for (from, to) in renames {
        df.rename(from, (*to).into())?;
    }
    Ok(())
}

/// Removes exact duplicate rows, keeping the first occurrence in order.
pub fn deduplicate(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.unique_stable(None, UniqueKeepStrategy::First, None)
}
