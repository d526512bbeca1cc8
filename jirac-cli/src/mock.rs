use std::cell::RefCell;

use jirac_jira::{IssueTransition, JiraApi, JiraError};
use serde_json::{json, Value};

pub struct MockJira {
    issue: Value,
    calls: RefCell<Vec<String>>,
}

impl MockJira {
    pub fn with_issue(issue: Value) -> Self {
        Self {
            issue,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_demo_issue() -> Self {
        Self::with_issue(json!({
            "id": "12345",
            "key": "PROJ-7",
            "self": "https://jira.example.com/rest/api/2/issue/12345",
            "fields": {
                "summary": "Wire the projector",
                "status": {"name": "In Progress"},
                "priority": {"name": "Major"},
                "assignee": {"displayName": "Alice"},
                "labels": ["x"],
                "components": [{"name": "api"}, {"name": "web"}],
                "created": "2023-01-05T10:15:00.000+0000"
            }
        }))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn matching(&self, field: &str, reference: &str) -> Result<Value, JiraError> {
        if self.issue.get(field).and_then(Value::as_str) == Some(reference) {
            return Ok(self.issue.clone());
        }
        Err(JiraError::NotFound {
            target: format!("issue {reference}"),
            body: "{\"errorMessages\":[\"Issue Does Not Exist\"]}".to_string(),
        })
    }
}

impl JiraApi for MockJira {
    fn get_issue_by_id(&self, id: &str) -> Result<Value, JiraError> {
        self.record(format!("get_issue_by_id {id}"));
        self.matching("id", id)
    }

    fn get_issue_by_key(&self, key: &str) -> Result<Value, JiraError> {
        self.record(format!("get_issue_by_key {key}"));
        self.matching("key", key)
    }

    fn search(&self, jql: &str, fields: &[String]) -> Result<Vec<Value>, JiraError> {
        self.record(format!("search {jql} fields={}", fields.join(",")));
        Ok(vec![self.issue.clone()])
    }

    fn get_comments(&self, key: &str) -> Result<Vec<Value>, JiraError> {
        self.record(format!("get_comments {key}"));
        Ok(vec![json!({
            "id": "900",
            "author": {"displayName": "Bob"},
            "created": "2023-01-06T08:00:00.000+0000",
            "body": "Looks good"
        })])
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<Value, JiraError> {
        self.record(format!("add_comment {key} {body}"));
        Ok(json!({"id": "900", "body": body}))
    }

    fn get_transitions(&self, key: &str) -> Result<Vec<IssueTransition>, JiraError> {
        self.record(format!("get_transitions {key}"));
        Ok(vec![
            IssueTransition {
                id: "11".to_string(),
                name: Some("Start Progress".to_string()),
                to_status: Some("In Progress".to_string()),
            },
            IssueTransition {
                id: "31".to_string(),
                name: Some("Close Issue".to_string()),
                to_status: Some("Done".to_string()),
            },
        ])
    }

    fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        resolution: Option<&str>,
    ) -> Result<(), JiraError> {
        self.record(format!(
            "transition_issue {key} {transition_id} {}",
            resolution.unwrap_or("-")
        ));
        Ok(())
    }

    fn update_issue(&self, key: &str, payload: &Value) -> Result<(), JiraError> {
        self.record(format!("update_issue {key} {payload}"));
        Ok(())
    }

    fn create_issue(&self, payload: &Value) -> Result<Value, JiraError> {
        self.record(format!("create_issue {payload}"));
        Ok(json!({"id": "12346", "key": "PROJ-8"}))
    }

    fn delete_issue(&self, key: &str) -> Result<(), JiraError> {
        self.record(format!("delete_issue {key}"));
        Ok(())
    }
}
