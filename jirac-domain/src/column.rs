use chrono::{DateTime, FixedOffset, Local};
use serde_json::Value;
use thiserror::Error;

use crate::text::flatten_rich_text;

pub const PLACEHOLDER: &str = "-";
pub const DEFAULT_COLUMNS: [&str; 5] = ["key", "priority", "status", "assignee", "summary"];

const JIRA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LIST_DELIMITER: &str = ", ";

#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Absent,
    Json(Value),
    List(Vec<String>),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot format column '{column}': {reason}")]
pub struct FormatError {
    pub column: String,
    pub reason: String,
}

/// Sort weight of a column. Every `Known` weight orders before `Unknown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Weight {
    Known(u16),
    Unknown,
}

type Extractor = fn(&str, &Value) -> RawValue;
type Formatter = fn(&str, RawValue) -> Result<String, FormatError>;

pub struct Column {
    pub name: &'static str,
    weight: u16,
    extract: Extractor,
    format: Formatter,
    placeholder: &'static str,
}

impl Column {
    const fn new(
        name: &'static str,
        weight: u16,
        extract: Extractor,
        format: Formatter,
        placeholder: &'static str,
    ) -> Self {
        Self {
            name,
            weight,
            extract,
            format,
            placeholder,
        }
    }
}

static COLUMNS: &[Column] = &[
    Column::new("key", 10, extract_top_level, format_verbatim, PLACEHOLDER),
    Column::new("id", 10, extract_top_level, format_verbatim, PLACEHOLDER),
    Column::new("self", 15, extract_top_level, format_verbatim, PLACEHOLDER),
    Column::new("issuetype", 20, extract_name, format_verbatim, PLACEHOLDER),
    Column::new("priority", 30, extract_name, format_verbatim, PLACEHOLDER),
    Column::new("status", 30, extract_name, format_verbatim, PLACEHOLDER),
    Column::new("resolution", 35, extract_name, format_verbatim, "Unresolved"),
    Column::new("assignee", 40, extract_user, format_verbatim, "Unassigned"),
    Column::new("reporter", 40, extract_user, format_verbatim, PLACEHOLDER),
    Column::new("created", 50, extract_field, format_timestamp, PLACEHOLDER),
    Column::new("updated", 50, extract_field, format_timestamp, PLACEHOLDER),
    Column::new("components", 60, extract_name_list, format_list, ""),
    Column::new("fixVersions", 60, extract_name_list, format_list, ""),
    Column::new("versions", 60, extract_name_list, format_list, ""),
    Column::new("summary", 90, extract_field, format_free_text, PLACEHOLDER),
    Column::new("description", 95, extract_rich_text, format_free_text, PLACEHOLDER),
];

// Used for every name missing from COLUMNS; its weight is never consulted.
static FALLBACK: Column = Column::new("*", 0, extract_field, format_verbatim, PLACEHOLDER);

pub fn registered_columns() -> impl Iterator<Item = &'static str> {
    COLUMNS.iter().map(|column| column.name)
}

pub fn extract(column: &str, issue: &Value) -> RawValue {
    (strategy(column).extract)(column, issue)
}

pub fn format(column: &str, raw: RawValue) -> Result<String, FormatError> {
    let strategy = strategy(column);
    match raw {
        RawValue::Absent => Ok(strategy.placeholder.to_string()),
        present => (strategy.format)(column, present),
    }
}

pub fn weight(column: &str) -> Weight {
    COLUMNS
        .iter()
        .find(|candidate| candidate.name == column)
        .map(|candidate| Weight::Known(candidate.weight))
        .unwrap_or(Weight::Unknown)
}

/// Formats a timestamp string the way the `created`/`updated` columns do.
pub fn format_timestamp_text(column: &str, text: &str) -> Result<String, FormatError> {
    let parsed = parse_timestamp(text).map_err(|error| FormatError {
        column: column.to_string(),
        reason: format!("invalid timestamp '{text}': {error}"),
    })?;
    Ok(parsed
        .with_timezone(&Local)
        .format(DISPLAY_TIMESTAMP_FORMAT)
        .to_string())
}

pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, segment| node.get(*segment))
        .filter(|value| !value.is_null())
}

pub(crate) fn display_name(user: &Value) -> Option<String> {
    ["displayName", "name", "emailAddress"]
        .iter()
        .filter_map(|key| user.get(*key).and_then(Value::as_str))
        .find_map(non_empty)
}

pub(crate) fn strip_carriage_returns(text: &str) -> String {
    text.replace('\r', "")
}

fn strategy(column: &str) -> &'static Column {
    COLUMNS
        .iter()
        .find(|candidate| candidate.name == column)
        .unwrap_or(&FALLBACK)
}

fn extract_top_level(column: &str, issue: &Value) -> RawValue {
    present(lookup(issue, &[column]))
}

fn extract_field(column: &str, issue: &Value) -> RawValue {
    present(lookup(issue, &["fields", column]))
}

fn extract_name(column: &str, issue: &Value) -> RawValue {
    lookup(issue, &["fields", column, "name"])
        .and_then(Value::as_str)
        .and_then(non_empty)
        .map(|name| RawValue::Json(Value::String(name)))
        .unwrap_or(RawValue::Absent)
}

fn extract_user(column: &str, issue: &Value) -> RawValue {
    lookup(issue, &["fields", column])
        .and_then(display_name)
        .map(|name| RawValue::Json(Value::String(name)))
        .unwrap_or(RawValue::Absent)
}

fn extract_name_list(column: &str, issue: &Value) -> RawValue {
    let names = lookup(issue, &["fields", column])
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    RawValue::List(names)
}

fn extract_rich_text(column: &str, issue: &Value) -> RawValue {
    lookup(issue, &["fields", column])
        .and_then(flatten_rich_text)
        .map(|text| RawValue::Json(Value::String(text)))
        .unwrap_or(RawValue::Absent)
}

fn format_verbatim(_column: &str, raw: RawValue) -> Result<String, FormatError> {
    Ok(match raw {
        RawValue::Absent => PLACEHOLDER.to_string(),
        RawValue::Json(Value::String(text)) => text,
        RawValue::Json(other) => other.to_string(),
        RawValue::List(items) => join_quoted(&items),
    })
}

fn format_timestamp(column: &str, raw: RawValue) -> Result<String, FormatError> {
    match raw {
        RawValue::Json(Value::String(text)) => format_timestamp_text(column, &text),
        other => Err(FormatError {
            column: column.to_string(),
            reason: format!("expected a timestamp string, got {other:?}"),
        }),
    }
}

fn format_free_text(column: &str, raw: RawValue) -> Result<String, FormatError> {
    match raw {
        RawValue::Json(Value::String(text)) => Ok(strip_carriage_returns(&text)),
        other => format_verbatim(column, other),
    }
}

fn format_list(column: &str, raw: RawValue) -> Result<String, FormatError> {
    match raw {
        RawValue::List(items) => Ok(join_quoted(&items)),
        other => format_verbatim(column, other),
    }
}

fn join_quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(LIST_DELIMITER)
}

fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_str(text, JIRA_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
}

fn present(value: Option<&Value>) -> RawValue {
    value
        .cloned()
        .map(RawValue::Json)
        .unwrap_or(RawValue::Absent)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
