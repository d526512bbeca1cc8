use serde_json::Value;

use crate::column::{
    display_name, format_timestamp_text, lookup, strip_carriage_returns, FormatError, PLACEHOLDER,
};
use crate::text::flatten_rich_text;

pub const COMMENT_HEADER: [&str; 3] = ["author", "created", "body"];

pub fn project_comment(comment: &Value) -> Result<Vec<String>, FormatError> {
    let author = lookup(comment, &["author"])
        .and_then(display_name)
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let created = match lookup(comment, &["created"]).and_then(Value::as_str) {
        Some(text) => format_timestamp_text("created", text)?,
        None => PLACEHOLDER.to_string(),
    };

    let body = lookup(comment, &["body"])
        .and_then(flatten_rich_text)
        .map(|text| strip_carriage_returns(&text))
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    Ok(vec![author, created, body])
}

pub fn comment_id(comment: &Value) -> Option<&str> {
    lookup(comment, &["id"]).and_then(Value::as_str)
}
