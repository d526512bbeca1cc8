use std::cmp::Ordering;

use serde_json::Value;

use crate::column::{self, FormatError, RawValue};

/// Orders columns by weight, then by name. Duplicates are kept.
pub fn sort_columns<S: AsRef<str>>(requested: &[S]) -> Vec<&str> {
    let mut columns = requested.iter().map(AsRef::as_ref).collect::<Vec<_>>();
    columns.sort_by(|left, right| column_order(left, right));
    columns
}

fn column_order(left: &str, right: &str) -> Ordering {
    column::weight(left)
        .cmp(&column::weight(right))
        .then_with(|| left.cmp(right))
}

pub fn header<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    sort_columns(requested)
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn project<S: AsRef<str>>(issue: &Value, requested: &[S]) -> Result<Vec<String>, FormatError> {
    sort_columns(requested)
        .into_iter()
        .map(|name| column::format(name, column::extract(name, issue)))
        .collect()
}

pub fn project_labeled<S: AsRef<str>>(
    issue: &Value,
    requested: &[S],
) -> Result<Vec<(String, String)>, FormatError> {
    let names = header(requested);
    let cells = project(issue, requested)?;
    Ok(names.into_iter().zip(cells).collect())
}

pub fn project_all(issue: &Value) -> Vec<(&'static str, RawValue)> {
    let mut names = column::registered_columns().collect::<Vec<_>>();
    names.sort_by(|left, right| column_order(left, right));
    names
        .into_iter()
        .map(|name| (name, column::extract(name, issue)))
        .collect()
}

/// Formats a single column, preferring the value already captured by
/// `project_all` for registered names.
pub fn field_value(issue: &Value, name: &str) -> Result<String, FormatError> {
    let raw = project_all(issue)
        .into_iter()
        .find(|(column, _)| *column == name)
        .map(|(_, raw)| raw)
        .unwrap_or_else(|| column::extract(name, issue));
    column::format(name, raw)
}
