use serde_json::Value;

/// Turns a description or comment body into plain text. Plain strings pass
/// through, API v3 documents are flattened, anything else keeps its JSON text.
pub(crate) fn flatten_rich_text(value: &Value) -> Option<String> {
    if let Some(text) = value.as_str() {
        return Some(text.to_string());
    }

    if let Some(raw) = value.get("raw").and_then(Value::as_str) {
        return Some(raw.to_string());
    }

    let is_doc = value
        .get("type")
        .and_then(Value::as_str)
        .map(|kind| kind == "doc")
        .unwrap_or(false);

    if !is_doc {
        return match value {
            Value::Null => None,
            other => Some(other.to_string()),
        };
    }

    let mut out = String::new();
    collect_document_text(value, &mut out);
    Some(out.trim().to_string())
}

fn collect_document_text(node: &Value, out: &mut String) {
    let children = || {
        node.get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    };

    match node.get("type").and_then(Value::as_str) {
        Some("text") => {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        Some("hardBreak") => out.push('\n'),
        Some("paragraph" | "heading" | "blockquote" | "listItem" | "codeBlock") => {
            for child in children() {
                collect_document_text(child, out);
            }
            out.push('\n');
        }
        _ => {
            for child in children() {
                collect_document_text(child, out);
            }
        }
    }
}
