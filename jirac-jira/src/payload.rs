use jirac_config::{Delta, OptionSet};
use serde_json::{json, Map, Value};

/// Comment and description bodies: plain text on v2, a document on v3.
pub fn rich_text(api_version: &str, text: &str) -> Value {
    if api_version == "3" {
        json!({
            "type": "doc",
            "version": 1,
            "content": [
                {
                    "type": "paragraph",
                    "content": [
                        {"type": "text", "text": text}
                    ]
                }
            ]
        })
    } else {
        Value::String(text.to_string())
    }
}

pub fn comment_payload(api_version: &str, text: &str) -> Value {
    json!({ "body": rich_text(api_version, text) })
}

pub fn transition_payload(transition_id: &str, resolution: Option<&str>) -> Value {
    let mut payload = json!({ "transition": {"id": transition_id} });
    if let Some(resolution) = resolution {
        payload["fields"] = json!({ "resolution": {"name": resolution} });
    }
    payload
}

/// Body for `PUT /issue/{key}`: plain field values under `fields`, list
/// deltas as add/remove operations under `update`.
pub fn edit_payload(options: &OptionSet) -> Value {
    let mut update = Map::new();
    for (field, deltas) in list_fields(options) {
        if deltas.is_empty() {
            continue;
        }
        let operations = deltas
            .iter()
            .map(|delta| match delta {
                Delta::Add(name) => json!({ "add": {"name": name} }),
                Delta::Remove(name) => json!({ "remove": {"name": name} }),
            })
            .collect::<Vec<_>>();
        update.insert(field.to_string(), Value::Array(operations));
    }

    let mut payload = json!({ "fields": Value::Object(scalar_fields(options)) });
    if !update.is_empty() {
        payload["update"] = Value::Object(update);
    }
    payload
}

/// Body for `POST /issue`. Removal deltas have nothing to remove from yet
/// and are ignored.
pub fn create_payload(options: &OptionSet) -> Value {
    let mut fields = scalar_fields(options);
    if let Some(project) = options.project.as_deref() {
        fields.insert("project".to_string(), json!({ "key": project }));
    }
    if let Some(issue_type) = options.issue_type.as_deref() {
        fields.insert("issuetype".to_string(), json!({ "name": issue_type }));
    }
    for (field, deltas) in list_fields(options) {
        let names = deltas
            .iter()
            .filter_map(|delta| match delta {
                Delta::Add(name) => Some(json!({ "name": name })),
                Delta::Remove(_) => None,
            })
            .collect::<Vec<_>>();
        if !names.is_empty() {
            fields.insert(field.to_string(), Value::Array(names));
        }
    }
    json!({ "fields": Value::Object(fields) })
}

fn scalar_fields(options: &OptionSet) -> Map<String, Value> {
    let api_version = options.api_version();
    let mut fields = options
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect::<Map<_, _>>();

    if let Some(summary) = options.summary.as_deref() {
        fields.insert("summary".to_string(), Value::from(summary));
    }
    if let Some(description) = options.description.as_deref() {
        fields.insert(
            "description".to_string(),
            rich_text(api_version, description),
        );
    }
    if let Some(assignee) = options.assignee.as_deref() {
        let user = if api_version == "3" {
            json!({ "accountId": assignee })
        } else {
            json!({ "name": assignee })
        };
        fields.insert("assignee".to_string(), user);
    }
    if let Some(priority) = options.priority.as_deref() {
        fields.insert("priority".to_string(), json!({ "name": priority }));
    }
    fields
}

fn list_fields(options: &OptionSet) -> [(&'static str, &[Delta]); 3] {
    [
        ("components", options.components.as_slice()),
        ("fixVersions", options.fix_versions.as_slice()),
        ("versions", options.affects_versions.as_slice()),
    ]
}

#[cfg(test)]
mod tests {
    use jirac_config::{Delta, OptionSet};
    use serde_json::json;

    use super::{comment_payload, create_payload, edit_payload, transition_payload};

    #[test]
    fn builds_comment_payload_shape_by_api_version() {
        assert_eq!(comment_payload("2", "hello"), json!({"body": "hello"}));
        assert_eq!(
            comment_payload("3", "hello"),
            json!({
                "body": {
                    "type": "doc",
                    "version": 1,
                    "content": [{
                        "type": "paragraph",
                        "content": [{"type": "text", "text": "hello"}]
                    }]
                }
            })
        );
    }

    #[test]
    fn comment_payload_keeps_text_as_given() {
        assert_eq!(
            comment_payload("2", "  indented\n\nlast line\n"),
            json!({"body": "  indented\n\nlast line\n"})
        );
    }

    #[test]
    fn adds_resolution_to_transition_when_given() {
        assert_eq!(
            transition_payload("31", None),
            json!({"transition": {"id": "31"}})
        );
        assert_eq!(
            transition_payload("31", Some("Fixed")),
            json!({"transition": {"id": "31"}, "fields": {"resolution": {"name": "Fixed"}}})
        );
    }

    #[test]
    fn edit_payload_sends_deltas_as_operations() {
        let mut options = OptionSet::default();
        options.summary = Some("New title".to_string());
        options.priority = Some("Blocker".to_string());
        options.assignee = Some("alice".to_string());
        options.components = vec![
            Delta::Add("api".to_string()),
            Delta::Remove("web".to_string()),
        ];
        options
            .fields
            .insert("customfield_1".to_string(), json!("x"));

        assert_eq!(
            edit_payload(&options),
            json!({
                "fields": {
                    "summary": "New title",
                    "priority": {"name": "Blocker"},
                    "assignee": {"name": "alice"},
                    "customfield_1": "x"
                },
                "update": {
                    "components": [
                        {"add": {"name": "api"}},
                        {"remove": {"name": "web"}}
                    ]
                }
            })
        );
    }

    #[test]
    fn edit_payload_without_deltas_has_no_update() {
        let payload = edit_payload(&OptionSet::default());
        assert_eq!(payload, json!({"fields": {}}));
    }

    #[test]
    fn create_payload_sets_project_type_and_added_lists() {
        let mut options = OptionSet::default();
        options.api_version = "3".to_string();
        options.project = Some("DEMO".to_string());
        options.issue_type = Some("Bug".to_string());
        options.summary = Some("Crash".to_string());
        options.description = Some("It crashes".to_string());
        options.fix_versions = vec![
            Delta::Add("1.0".to_string()),
            Delta::Remove("0.9".to_string()),
        ];
        options
            .fields
            .insert("summary".to_string(), json!("overridden"));

        let payload = create_payload(&options);
        let fields = &payload["fields"];
        assert_eq!(fields["project"], json!({"key": "DEMO"}));
        assert_eq!(fields["issuetype"], json!({"name": "Bug"}));
        assert_eq!(fields["summary"], json!("Crash"));
        assert_eq!(fields["description"]["type"], json!("doc"));
        assert_eq!(fields["fixVersions"], json!([{"name": "1.0"}]));
        assert!(fields.get("components").is_none());
    }
}
