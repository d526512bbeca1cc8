use std::{fs, sync::OnceLock, time::Duration};

use anyhow::{Context, Result};
use jirac_config::{AuthMethod, OptionSet};
use regex::Regex;
use reqwest::{
    blocking::{Client, RequestBuilder},
    Certificate, StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

mod payload;

use payload::{comment_payload, transition_payload};

pub use payload::{create_payload, edit_payload};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("{target} not found: {body}")]
    NotFound { target: String, body: String },
    #[error("jira {operation} request failed: status={status} body={body}")]
    Http {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("failed to {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode Jira {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("search returned page token '{token}' twice")]
    RepeatedPageToken { token: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueTransition {
    pub id: String,
    pub name: Option<String>,
    pub to_status: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueRef<'a> {
    Id(&'a str),
    Key(&'a str),
}

impl<'a> IssueRef<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let reference = reference.trim();
        if issue_id_pattern().is_match(reference) {
            Self::Id(reference)
        } else {
            Self::Key(reference)
        }
    }
}

pub trait JiraApi {
    fn get_issue_by_id(&self, id: &str) -> Result<Value, JiraError>;
    fn get_issue_by_key(&self, key: &str) -> Result<Value, JiraError>;
    fn search(&self, jql: &str, fields: &[String]) -> Result<Vec<Value>, JiraError>;
    fn get_comments(&self, key: &str) -> Result<Vec<Value>, JiraError>;
    fn add_comment(&self, key: &str, body: &str) -> Result<Value, JiraError>;
    fn get_transitions(&self, key: &str) -> Result<Vec<IssueTransition>, JiraError>;
    fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        resolution: Option<&str>,
    ) -> Result<(), JiraError>;
    fn update_issue(&self, key: &str, payload: &Value) -> Result<(), JiraError>;
    fn create_issue(&self, payload: &Value) -> Result<Value, JiraError>;
    fn delete_issue(&self, key: &str) -> Result<(), JiraError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum AuthMode {
    Anonymous,
    Basic { user: String, password: String },
    Bearer { token: String },
}

pub struct JiraClient {
    api_version: String,
    base_url: String,
    page_size: usize,
    http: Client,
    auth_mode: AuthMode,
}

#[derive(Deserialize)]
struct SearchPayload {
    #[serde(default)]
    issues: Vec<Value>,
    total: Option<usize>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Default, Deserialize)]
struct CommentsPayload {
    #[serde(default)]
    comments: Vec<Value>,
}

#[derive(Default, Deserialize)]
struct TransitionsPayload {
    #[serde(default)]
    transitions: Vec<TransitionPayload>,
}

#[derive(Default, Deserialize)]
struct TransitionPayload {
    id: Option<String>,
    name: Option<String>,
    to: Option<StatusLike>,
}

#[derive(Default, Deserialize)]
struct StatusLike {
    name: Option<String>,
}

impl JiraClient {
    pub fn from_options(options: &OptionSet) -> Result<Self> {
        let api_version = options.api_version().to_string();
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(options.insecure)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));

        if let Some(path) = options.ca_cert.as_deref() {
            let pem = fs::read(path)
                .with_context(|| format!("failed to read CA certificate {}", path.display()))?;
            let certificate = Certificate::from_pem(&pem)
                .with_context(|| format!("invalid CA certificate {}", path.display()))?;
            builder = builder.add_root_certificate(certificate);
        }

        let http = builder
            .build()
            .with_context(|| "failed to build Jira HTTP client")?;

        Ok(Self {
            base_url: format!("{}/rest/api/{api_version}", options.server_url()),
            api_version,
            page_size: options.page_size,
            http,
            auth_mode: auth_mode(options),
        })
    }

    fn search_page(
        &self,
        jql: &str,
        fields: &[String],
        start_at: usize,
        page_token: Option<&str>,
    ) -> Result<SearchPayload, JiraError> {
        let endpoint = format!("{}/{}", self.base_url, self.search_endpoint());
        let mut query = vec![
            ("jql", jql.to_string()),
            ("maxResults", self.page_size.to_string()),
        ];
        match page_token {
            Some(token) => query.push(("nextPageToken", token.to_string())),
            None => query.push(("startAt", start_at.to_string())),
        }
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }

        let body = self.call(
            "search",
            "search results",
            self.http.get(endpoint).query(&query),
            None,
        )?;
        decode("search", body)
    }

    fn search_endpoint(&self) -> &str {
        if self.api_version == "3" {
            "search/jql"
        } else {
            "search"
        }
    }

    fn issue_url(&self, reference: &str) -> String {
        format!("{}/issue/{}", self.base_url, reference)
    }

    fn fetch_issue(&self, reference: &str) -> Result<Value, JiraError> {
        self.call(
            "issue",
            &format!("issue {reference}"),
            self.http.get(self.issue_url(reference)),
            None,
        )
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_mode {
            AuthMode::Anonymous => request,
            AuthMode::Basic { user, password } => request.basic_auth(user, Some(password)),
            AuthMode::Bearer { token } => request.bearer_auth(token),
        }
    }

    fn call(
        &self,
        operation: &'static str,
        target: &str,
        request: RequestBuilder,
        payload: Option<&Value>,
    ) -> Result<Value, JiraError> {
        let transport = |source| JiraError::Transport { operation, source };

        let request = match payload {
            Some(payload) => request.json(payload),
            None => request,
        };
        let request = self.with_auth(request).build().map_err(transport)?;

        let payload_text = payload.map(Value::to_string).unwrap_or_default();
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            payload = %payload_text,
            "jira request"
        );

        let response = self.http.execute(request).map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;
        tracing::debug!(status = status.as_u16(), body = %body, "jira response");

        response_body(operation, target, status, body)
    }
}

impl JiraApi for JiraClient {
    fn get_issue_by_id(&self, id: &str) -> Result<Value, JiraError> {
        self.fetch_issue(id)
    }

    fn get_issue_by_key(&self, key: &str) -> Result<Value, JiraError> {
        self.fetch_issue(key)
    }

    fn search(&self, jql: &str, fields: &[String]) -> Result<Vec<Value>, JiraError> {
        let issues = collect_pages(|start_at, page_token| {
            self.search_page(jql, fields, start_at, page_token)
        })?;
        tracing::debug!(count = issues.len(), "search finished");
        Ok(issues)
    }

    fn get_comments(&self, key: &str) -> Result<Vec<Value>, JiraError> {
        let body = self.call(
            "comment list",
            &format!("issue {key}"),
            self.http.get(format!("{}/comment", self.issue_url(key))),
            None,
        )?;
        let payload: CommentsPayload = decode("comment list", body)?;
        Ok(payload.comments)
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<Value, JiraError> {
        let payload = comment_payload(&self.api_version, body);
        self.call(
            "comment create",
            &format!("issue {key}"),
            self.http.post(format!("{}/comment", self.issue_url(key))),
            Some(&payload),
        )
    }

    fn get_transitions(&self, key: &str) -> Result<Vec<IssueTransition>, JiraError> {
        let body = self.call(
            "transition list",
            &format!("issue {key}"),
            self.http.get(format!("{}/transitions", self.issue_url(key))),
            None,
        )?;
        let payload: TransitionsPayload = decode("transition list", body)?;
        Ok(payload
            .transitions
            .into_iter()
            .map(into_issue_transition)
            .collect())
    }

    fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        resolution: Option<&str>,
    ) -> Result<(), JiraError> {
        let payload = transition_payload(transition_id.trim(), resolution);
        self.call(
            "transition apply",
            &format!("issue {key}"),
            self.http.post(format!("{}/transitions", self.issue_url(key))),
            Some(&payload),
        )?;
        Ok(())
    }

    fn update_issue(&self, key: &str, payload: &Value) -> Result<(), JiraError> {
        self.call(
            "issue update",
            &format!("issue {key}"),
            self.http.put(self.issue_url(key)),
            Some(payload),
        )?;
        Ok(())
    }

    fn create_issue(&self, payload: &Value) -> Result<Value, JiraError> {
        self.call(
            "issue create",
            "project or issue type",
            self.http.post(format!("{}/issue", self.base_url)),
            Some(payload),
        )
    }

    fn delete_issue(&self, key: &str) -> Result<(), JiraError> {
        self.call(
            "issue delete",
            &format!("issue {key}"),
            self.http.delete(self.issue_url(key)),
            None,
        )?;
        Ok(())
    }
}

fn auth_mode(options: &OptionSet) -> AuthMode {
    let Some(secret) = options.password.as_deref() else {
        return AuthMode::Anonymous;
    };

    match (options.auth_method(), options.username.as_deref()) {
        (AuthMethod::Basic, Some(user)) => AuthMode::Basic {
            user: user.to_string(),
            password: secret.to_string(),
        },
        (AuthMethod::Basic, None) => {
            tracing::warn!("basic auth selected without a username, sending no credentials");
            AuthMode::Anonymous
        }
        (AuthMethod::Bearer, _) => AuthMode::Bearer {
            token: secret.to_string(),
        },
    }
}

// Walks `startAt` offsets until `total` is reached, or follows
// `nextPageToken` while the server keeps handing out new ones.
fn collect_pages<F>(mut fetch_page: F) -> Result<Vec<Value>, JiraError>
where
    F: FnMut(usize, Option<&str>) -> Result<SearchPayload, JiraError>,
{
    let mut issues = Vec::new();
    let mut start_at = 0usize;
    let mut seen_tokens: Vec<String> = Vec::new();

    loop {
        let page = fetch_page(start_at, seen_tokens.last().map(String::as_str))?;
        let page_len = page.issues.len();
        issues.extend(page.issues);

        if page_len == 0 {
            break;
        }
        if let Some(token) = page.next_page_token {
            if seen_tokens.contains(&token) {
                return Err(JiraError::RepeatedPageToken { token });
            }
            seen_tokens.push(token);
            continue;
        }
        match page.total {
            Some(total) if start_at + page_len < total => start_at += page_len,
            _ => break,
        }
    }

    Ok(issues)
}

fn response_body(
    operation: &'static str,
    target: &str,
    status: StatusCode,
    body: String,
) -> Result<Value, JiraError> {
    if status == StatusCode::NOT_FOUND {
        return Err(JiraError::NotFound {
            target: target.to_string(),
            body,
        });
    }
    if !status.is_success() {
        return Err(JiraError::Http {
            operation,
            status: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|source| JiraError::Decode { operation, source })
}

fn decode<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    body: Value,
) -> Result<T, JiraError> {
    serde_json::from_value(body).map_err(|source| JiraError::Decode { operation, source })
}

fn into_issue_transition(payload: TransitionPayload) -> IssueTransition {
    IssueTransition {
        id: payload
            .id
            .and_then(non_empty)
            .unwrap_or_else(|| "unknown".to_string()),
        name: payload.name.and_then(non_empty),
        to_status: payload.to.and_then(|status| status.name.and_then(non_empty)),
    }
}

fn issue_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+$").expect("regex"))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
