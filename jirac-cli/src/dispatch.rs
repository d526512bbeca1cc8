use std::io::Write;

use anyhow::{Context, Result};
use jirac_config::{Command, OptionSet};
use jirac_domain::{
    comment_id, field_value, header, project, project_comment, project_labeled, COMMENT_HEADER,
    PLACEHOLDER,
};
use jirac_jira::{create_payload, edit_payload, IssueRef, IssueTransition, JiraApi, JiraError};
use serde_json::Value;

use crate::render::Renderer;

const TRANSITION_HEADER: [&str; 3] = ["id", "name", "to"];
// Columns read from the issue itself rather than from `fields`.
const TOP_LEVEL_COLUMNS: [&str; 3] = ["key", "id", "self"];

pub fn dispatch<C, W>(
    client: &C,
    options: &OptionSet,
    command: Command,
    renderer: Renderer,
    out: &mut W,
) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    tracing::debug!(command = command.name(), "dispatching");
    match command {
        Command::Query => run_query(client, options, renderer, out),
        Command::View => run_view(client, options, renderer, out),
        Command::ViewField => run_view_field(client, options, out),
        Command::Comment => run_comment(client, options, out),
        Command::Transition => run_transition(client, options, renderer, out),
        Command::Edit => run_edit(client, options, out),
        Command::Create => run_create(client, options, out),
        Command::Delete => run_delete(client, options, out),
    }
}

fn run_query<C, W>(client: &C, options: &OptionSet, renderer: Renderer, out: &mut W) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let jql = options.jql.as_deref().context("missing JQL query")?;
    let columns = options.display_columns();
    let issues = client.search(jql, &search_fields(&columns))?;

    let rows = issues
        .iter()
        .map(|issue| project(issue, &columns))
        .collect::<Result<Vec<_>, _>>()?;
    renderer.table(out, &header(&columns), &rows)?;
    Ok(())
}

fn run_view<C, W>(client: &C, options: &OptionSet, renderer: Renderer, out: &mut W) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let (issue, key) = resolve_issue(client, options)?;
    let detail = project_labeled(&issue, &options.display_columns())?;
    renderer.detail(out, &detail)?;

    let comments = client.get_comments(&key)?;
    if comments.is_empty() {
        return Ok(());
    }
    let rows = comments
        .iter()
        .map(project_comment)
        .collect::<Result<Vec<_>, _>>()?;
    writeln!(out)?;
    renderer.table(out, &COMMENT_HEADER, &rows)?;
    Ok(())
}

fn run_view_field<C, W>(client: &C, options: &OptionSet, out: &mut W) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let name = options.field_name.as_deref().context("missing field name")?;
    let (issue, _) = resolve_issue(client, options)?;
    writeln!(out, "{}", field_value(&issue, name)?)?;
    Ok(())
}

fn run_comment<C, W>(client: &C, options: &OptionSet, out: &mut W) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let text = options.comment.as_deref().context("missing comment text")?;
    let (_, key) = resolve_issue(client, options)?;
    let created = client.add_comment(&key, text)?;
    writeln!(
        out,
        "Comment {} added to {key}",
        comment_id(&created).unwrap_or("?")
    )?;
    Ok(())
}

fn run_transition<C, W>(
    client: &C,
    options: &OptionSet,
    renderer: Renderer,
    out: &mut W,
) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let (_, key) = resolve_issue(client, options)?;
    let transitions = client.get_transitions(&key)?;

    let Some(target) = options.state.as_deref() else {
        renderer.table(out, &TRANSITION_HEADER, &transition_rows(&transitions))?;
        return Ok(());
    };

    let transition = find_transition(&transitions, target).ok_or_else(|| JiraError::NotFound {
        target: format!("transition '{target}' for {key}"),
        body: format!("available: {}", transition_names(&transitions)),
    })?;
    client.transition_issue(&key, &transition.id, options.resolution.as_deref())?;

    let status = transition
        .to_status
        .as_deref()
        .or(transition.name.as_deref())
        .unwrap_or(target);
    writeln!(out, "{key} -> {status}")?;
    Ok(())
}

fn run_edit<C, W>(client: &C, options: &OptionSet, out: &mut W) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let (_, key) = resolve_issue(client, options)?;
    client.update_issue(&key, &edit_payload(options))?;
    writeln!(out, "Updated {key}")?;
    Ok(())
}

fn run_create<C, W>(client: &C, options: &OptionSet, out: &mut W) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let created = client.create_issue(&create_payload(options))?;
    let key = created
        .get("key")
        .and_then(Value::as_str)
        .context("create response did not include an issue key")?;
    writeln!(out, "{key}")?;
    Ok(())
}

fn run_delete<C, W>(client: &C, options: &OptionSet, out: &mut W) -> Result<()>
where
    C: JiraApi + ?Sized,
    W: Write,
{
    let (_, key) = resolve_issue(client, options)?;
    client.delete_issue(&key)?;
    writeln!(out, "Deleted {key}")?;
    Ok(())
}

fn resolve_issue<C>(client: &C, options: &OptionSet) -> Result<(Value, String)>
where
    C: JiraApi + ?Sized,
{
    let reference = options.issue_key.as_deref().context("missing issue key")?;
    let issue = match IssueRef::parse(reference) {
        IssueRef::Id(id) => client.get_issue_by_id(id)?,
        IssueRef::Key(key) => client.get_issue_by_key(key)?,
    };
    let key = issue
        .get("key")
        .and_then(Value::as_str)
        .unwrap_or(reference)
        .to_string();
    Ok((issue, key))
}

fn search_fields(columns: &[String]) -> Vec<String> {
    let mut fields = Vec::new();
    for column in columns {
        if TOP_LEVEL_COLUMNS.contains(&column.as_str()) || fields.contains(column) {
            continue;
        }
        fields.push(column.clone());
    }
    fields
}

fn find_transition<'a>(
    transitions: &'a [IssueTransition],
    target: &str,
) -> Option<&'a IssueTransition> {
    let same_name = |value: &Option<String>| {
        value
            .as_deref()
            .map(|value| value.eq_ignore_ascii_case(target.trim()))
            .unwrap_or(false)
    };
    transitions
        .iter()
        .find(|transition| same_name(&transition.name))
        .or_else(|| {
            transitions
                .iter()
                .find(|transition| same_name(&transition.to_status))
        })
}

fn transition_rows(transitions: &[IssueTransition]) -> Vec<Vec<String>> {
    let or_placeholder =
        |value: &Option<String>| value.clone().unwrap_or_else(|| PLACEHOLDER.to_string());
    transitions
        .iter()
        .map(|transition| {
            vec![
                transition.id.clone(),
                or_placeholder(&transition.name),
                or_placeholder(&transition.to_status),
            ]
        })
        .collect()
}

fn transition_names(transitions: &[IssueTransition]) -> String {
    if transitions.is_empty() {
        return "none".to_string();
    }
    transitions
        .iter()
        .filter_map(|transition| transition.name.as_deref())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use jirac_config::{Command, Delta, OptionSet, OutputFormat};
    use jirac_jira::{IssueTransition, JiraError};
    use serde_json::json;

    use super::{dispatch, search_fields, transition_rows};
    use crate::{mock::MockJira, render::Renderer};

    fn run(client: &MockJira, options: &OptionSet, command: Command) -> anyhow::Result<String> {
        let mut out = Vec::new();
        dispatch(
            client,
            options,
            command,
            Renderer::new(OutputFormat::Table, false),
            &mut out,
        )?;
        Ok(String::from_utf8(out).expect("utf8"))
    }

    fn with_issue(reference: &str) -> OptionSet {
        let mut options = OptionSet::default();
        options.issue_key = Some(reference.to_string());
        options
    }

    #[test]
    fn numeric_and_key_references_converge_on_same_view() {
        let client = MockJira::with_demo_issue();

        let by_id = run(&client, &with_issue("12345"), Command::View).expect("view by id");
        let by_key = run(&client, &with_issue("PROJ-7"), Command::View).expect("view by key");

        assert_eq!(by_id, by_key);
        assert_eq!(
            client.calls(),
            vec![
                "get_issue_by_id 12345",
                "get_comments PROJ-7",
                "get_issue_by_key PROJ-7",
                "get_comments PROJ-7",
            ]
        );

        let labels = by_id
            .lines()
            .take(5)
            .map(|line| line.split_whitespace().next().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["key", "priority", "status", "assignee", "summary"]);
        assert!(by_id.contains("author"));
        assert!(by_id.contains("Looks good"));
    }

    #[test]
    fn query_renders_one_row_per_issue() {
        let client = MockJira::with_demo_issue();
        let mut options = OptionSet::default();
        options.jql = Some("project = PROJ".to_string());
        options.columns = vec!["summary".to_string(), "key".to_string(), "labels".to_string()];

        let output = run(&client, &options, Command::Query).expect("query");
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("key"));
        assert!(lines[0].ends_with("labels"));
        assert!(lines[1].starts_with("PROJ-7"));
        assert_eq!(
            client.calls(),
            vec!["search project = PROJ fields=summary,labels"]
        );
    }

    #[test]
    fn view_field_prints_single_value() {
        let client = MockJira::with_demo_issue();
        let mut options = with_issue("PROJ-7");
        options.field_name = Some("components".to_string());

        let output = run(&client, &options, Command::ViewField).expect("viewfield");
        assert_eq!(output, "'api', 'web'\n");
    }

    #[test]
    fn comment_resolves_then_posts() {
        let client = MockJira::with_demo_issue();
        let mut options = with_issue("12345");
        options.comment = Some("Ship it".to_string());

        let output = run(&client, &options, Command::Comment).expect("comment");
        assert_eq!(output, "Comment 900 added to PROJ-7\n");
        assert_eq!(
            client.calls(),
            vec!["get_issue_by_id 12345", "add_comment PROJ-7 Ship it"]
        );
    }

    #[test]
    fn transition_matches_name_or_status() {
        let client = MockJira::with_demo_issue();
        let mut options = with_issue("PROJ-7");
        options.state = Some("done".to_string());
        options.resolution = Some("Fixed".to_string());

        let output = run(&client, &options, Command::Transition).expect("transition");
        assert_eq!(output, "PROJ-7 -> Done\n");
        assert!(client
            .calls()
            .contains(&"transition_issue PROJ-7 31 Fixed".to_string()));
    }

    #[test]
    fn transition_without_state_lists_options() {
        let client = MockJira::with_demo_issue();
        let output =
            run(&client, &with_issue("PROJ-7"), Command::Transition).expect("transitions");
        assert!(output.starts_with("id"));
        assert!(output.contains("Close Issue"));
    }

    #[test]
    fn transition_rows_fill_missing_names() {
        let rows = transition_rows(&[IssueTransition {
            id: "41".to_string(),
            name: None,
            to_status: Some("Review".to_string()),
        }]);
        assert_eq!(rows, vec![vec!["41", "-", "Review"]]);
    }

    #[test]
    fn unknown_transition_is_not_found() {
        let client = MockJira::with_demo_issue();
        let mut options = with_issue("PROJ-7");
        options.state = Some("Teleport".to_string());

        let error = run(&client, &options, Command::Transition).expect_err("no match");
        let jira_error = error.downcast_ref::<JiraError>().expect("jira error");
        assert!(matches!(jira_error, JiraError::NotFound { .. }));
        assert!(error.to_string().contains("Start Progress, Close Issue"));
    }

    #[test]
    fn edit_sends_deltas() {
        let client = MockJira::with_demo_issue();
        let mut options = with_issue("PROJ-7");
        options.components = vec![Delta::Remove("web".to_string())];

        let output = run(&client, &options, Command::Edit).expect("edit");
        assert_eq!(output, "Updated PROJ-7\n");
        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].contains(r#""remove":{"name":"web"}"#));
    }

    #[test]
    fn create_prints_new_key() {
        let client = MockJira::with_demo_issue();
        let mut options = OptionSet::default();
        options.project = Some("PROJ".to_string());
        options.issue_type = Some("Task".to_string());
        options.summary = Some("New".to_string());

        let output = run(&client, &options, Command::Create).expect("create");
        assert_eq!(output, "PROJ-8\n");
    }

    #[test]
    fn delete_uses_resolved_key() {
        let client = MockJira::with_demo_issue();
        let output = run(&client, &with_issue("12345"), Command::Delete).expect("delete");
        assert_eq!(output, "Deleted PROJ-7\n");
        assert_eq!(
            client.calls(),
            vec!["get_issue_by_id 12345", "delete_issue PROJ-7"]
        );
    }

    #[test]
    fn missing_issue_surfaces_not_found() {
        let client = MockJira::with_demo_issue();
        let error = run(&client, &with_issue("NOPE-1"), Command::View).expect_err("missing");
        assert!(matches!(
            error.downcast_ref::<JiraError>(),
            Some(JiraError::NotFound { .. })
        ));
    }

    #[test]
    fn bad_timestamp_fails_the_view() {
        let client = MockJira::with_issue(json!({
            "id": "1",
            "key": "PROJ-1",
            "fields": {"created": "not a date"}
        }));
        let mut options = with_issue("PROJ-1");
        options.columns = vec!["created".to_string()];

        let error = run(&client, &options, Command::View).expect_err("format error");
        assert!(error.to_string().contains("created"));
    }

    #[test]
    fn search_fields_skip_top_level_and_duplicates() {
        let columns = ["key", "summary", "id", "summary", "customfield_1"]
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>();
        assert_eq!(search_fields(&columns), vec!["summary", "customfield_1"]);
    }
}
