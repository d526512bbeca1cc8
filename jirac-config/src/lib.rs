use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
};

use jirac_domain::{registered_columns, DEFAULT_COLUMNS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

mod command;

pub use command::{validate, Command, UsageError};

pub const DEFAULT_URL: &str = "http://localhost:8080";
const DEFAULT_API_VERSION: &str = "2";
const DEFAULT_PAGE_SIZE: usize = 100;
const CONFIG_FILE_ENV: &str = "JIRAC_CONFIG_FILE";
const USERNAME_ENV: &str = "JIRAC_USERNAME";
const PASSWORD_ENV: &str = "JIRAC_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config at {path} must be a JSON object")]
    NotAnObject { path: PathBuf },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Tsv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Basic,
    Bearer,
}

/// One change to a list-valued field such as components or fix versions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delta {
    Add(String),
    Remove(String),
}

impl Delta {
    /// `-name` removes, `+name` or a bare name adds.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (delta, name): (fn(String) -> Self, &str) = match raw.strip_prefix('-') {
            Some(rest) => (Self::Remove, rest),
            None => (Self::Add, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(delta(name.to_string()))
    }
}

/// Options read from the config file, already merged over built-in defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<AuthMethod>,
    pub insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
    pub debug: bool,
    pub output: OutputFormat,
    pub page_size: usize,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            password: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            auth_method: None,
            insecure: false,
            ca_cert: None,
            debug: false,
            output: OutputFormat::Table,
            page_size: DEFAULT_PAGE_SIZE,
            columns: Vec::new(),
            project: None,
            issue_type: None,
            fields: BTreeMap::new(),
        }
    }
}

impl PersistedConfig {
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let payload = match fs::read_to_string(path) {
            Ok(payload) => payload,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::parse(&payload, path)
    }

    pub fn parse(payload: &str, path: &Path) -> Result<Self, ConfigError> {
        let parse_error = |source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        };

        let stripped = strip_comment_lines(payload);
        let overlay = if stripped.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str::<Value>(&stripped).map_err(parse_error)?
        };
        if !overlay.is_object() {
            return Err(ConfigError::NotAnObject {
                path: path.to_path_buf(),
            });
        }

        let mut merged = serde_json::to_value(Self::default()).map_err(parse_error)?;
        deep_merge(&mut merged, overlay);
        serde_json::from_value(merged).map_err(parse_error)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            username: env::var(USERNAME_ENV).ok().and_then(non_empty),
            password: env::var(PASSWORD_ENV).ok().and_then(non_empty),
        }
    }
}

/// Raw command-line input, before it is merged with the other sources.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    pub positional: Vec<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_version: Option<String>,
    pub issue_type: Option<String>,
    pub project: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub components: Vec<String>,
    pub fix_versions: Vec<String>,
    pub affects_versions: Vec<String>,
    pub fields: Vec<String>,
    pub comment: Option<String>,
    pub state: Option<String>,
    pub resolution: Option<String>,
    pub columns: Option<String>,
    pub output: Option<OutputFormat>,
    pub ca_cert: Option<PathBuf>,
    pub insecure: bool,
    pub debug: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionSet {
    pub url: String,
    pub api_version: String,
    pub auth_method: Option<AuthMethod>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    pub debug: bool,
    pub output: OutputFormat,
    pub page_size: usize,
    pub columns: Vec<String>,
    pub issue_key: Option<String>,
    pub jql: Option<String>,
    pub field_name: Option<String>,
    pub comment: Option<String>,
    pub state: Option<String>,
    pub resolution: Option<String>,
    pub project: Option<String>,
    pub issue_type: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub components: Vec<Delta>,
    pub fix_versions: Vec<Delta>,
    pub affects_versions: Vec<Delta>,
    pub fields: BTreeMap<String, Value>,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self::from_persisted(PersistedConfig::default())
    }
}

impl OptionSet {
    fn from_persisted(config: PersistedConfig) -> Self {
        Self {
            url: config.url,
            api_version: config.api_version,
            auth_method: config.auth_method,
            username: config.username.and_then(non_empty),
            password: config.password.and_then(non_empty),
            insecure: config.insecure,
            ca_cert: config.ca_cert,
            debug: config.debug,
            output: config.output,
            page_size: config.page_size.max(1),
            columns: expand_columns(config.columns.iter().map(String::as_str)),
            issue_key: None,
            jql: None,
            field_name: None,
            comment: None,
            state: None,
            resolution: None,
            project: config.project.and_then(non_empty),
            issue_type: config.issue_type.and_then(non_empty),
            summary: None,
            description: None,
            assignee: None,
            priority: None,
            components: Vec::new(),
            fix_versions: Vec::new(),
            affects_versions: Vec::new(),
            fields: config.fields,
        }
    }

    pub fn api_version(&self) -> &str {
        match self.api_version.trim() {
            "3" => "3",
            _ => "2",
        }
    }

    pub fn auth_method(&self) -> AuthMethod {
        if let Some(method) = self.auth_method {
            return method;
        }
        if self.api_version() == "3" || self.username.is_some() {
            AuthMethod::Basic
        } else {
            AuthMethod::Bearer
        }
    }

    pub fn server_url(&self) -> String {
        normalize_server(&self.url)
    }

    pub fn display_columns(&self) -> Vec<String> {
        if self.columns.is_empty() {
            return DEFAULT_COLUMNS.iter().map(|name| name.to_string()).collect();
        }
        self.columns.clone()
    }

    /// `--summary` wins over a `summary` entry in the field map.
    pub fn summary_text(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .or_else(|| self.fields.get("summary").and_then(Value::as_str))
    }

    /// Copy safe to log: the password keeps its length but not its characters.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.password = self
            .password
            .as_ref()
            .map(|password| "*".repeat(password.chars().count()));
        copy
    }
}

/// Merges defaults, config file, environment and flags, lowest to highest
/// precedence, and picks the command named by the first positional token.
pub fn resolve(
    persisted: PersistedConfig,
    environment: &Environment,
    flags: FlagOverrides,
) -> Result<(OptionSet, Command), UsageError> {
    let mut options = OptionSet::from_persisted(persisted);

    override_with(&mut options.username, environment.username.clone());
    override_with(&mut options.password, environment.password.clone());

    if let Some(url) = flags.url.and_then(non_empty) {
        options.url = url;
    }
    if let Some(version) = flags.api_version.and_then(non_empty) {
        options.api_version = version;
    }
    override_with(&mut options.username, flags.username);
    override_with(&mut options.password, flags.password);
    override_with(&mut options.project, flags.project);
    override_with(&mut options.issue_type, flags.issue_type);
    override_with(&mut options.summary, flags.summary);
    override_with(&mut options.description, flags.description);
    override_with(&mut options.assignee, flags.assignee);
    override_with(&mut options.priority, flags.priority);
    override_with(&mut options.comment, flags.comment);
    override_with(&mut options.state, flags.state);
    override_with(&mut options.resolution, flags.resolution);

    options.components.extend(parse_deltas(&flags.components));
    options.fix_versions.extend(parse_deltas(&flags.fix_versions));
    options
        .affects_versions
        .extend(parse_deltas(&flags.affects_versions));

    for pair in &flags.fields {
        let (name, value) = parse_field_pair(pair)?;
        options.fields.insert(name, value);
    }

    if let Some(columns) = flags.columns {
        options.columns = expand_columns(columns.split(','));
    }
    if let Some(output) = flags.output {
        options.output = output;
    }
    if flags.ca_cert.is_some() {
        options.ca_cert = flags.ca_cert;
    }
    options.insecure |= flags.insecure;
    options.debug |= flags.debug;

    let mut positional = flags.positional.into_iter();
    let command = match positional.next() {
        Some(name) => Command::parse(&name)?,
        None => return Err(UsageError::MissingCommand),
    };
    apply_positional(command, positional.collect(), &mut options)?;

    Ok((options, command))
}

pub fn default_config_path() -> PathBuf {
    if let Some(override_path) = env::var_os(CONFIG_FILE_ENV) {
        return PathBuf::from(override_path);
    }

    let mut base = env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.push(".jirac.json");
    base
}

/// Expands `default` and `all` in place; other names pass through untouched.
pub fn expand_columns<'a, I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut columns = Vec::new();
    for token in tokens.into_iter().map(str::trim) {
        match token {
            "" => {}
            "default" => columns.extend(DEFAULT_COLUMNS.iter().map(|name| name.to_string())),
            "all" => columns.extend(registered_columns().map(str::to_string)),
            name => columns.push(name.to_string()),
        }
    }
    columns
}

fn apply_positional(
    command: Command,
    args: Vec<String>,
    options: &mut OptionSet,
) -> Result<(), UsageError> {
    let mut args = args.into_iter();

    match command {
        Command::Query => {
            let jql = args.by_ref().collect::<Vec<_>>().join(" ");
            options.jql = non_empty(jql);
        }
        Command::Create => {}
        Command::ViewField => {
            options.field_name = args.next().and_then(non_empty);
            options.issue_key = args.next().and_then(non_empty);
        }
        Command::Comment => {
            options.issue_key = args.next().and_then(non_empty);
            let text = args.by_ref().collect::<Vec<_>>().join(" ");
            if options.comment.is_none() {
                options.comment = non_empty(text);
            }
        }
        Command::Transition => {
            options.issue_key = args.next().and_then(non_empty);
            let state = args.by_ref().collect::<Vec<_>>().join(" ");
            if options.state.is_none() {
                options.state = non_empty(state);
            }
        }
        Command::View | Command::Edit | Command::Delete => {
            options.issue_key = args.next().and_then(non_empty);
        }
    }

    let extra = args.collect::<Vec<_>>();
    if !extra.is_empty() {
        return Err(UsageError::UnexpectedArguments {
            command: command.name(),
            extra: extra.join(" "),
        });
    }
    Ok(())
}

fn parse_deltas(values: &[String]) -> Vec<Delta> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .filter_map(Delta::parse)
        .collect()
}

fn parse_field_pair(pair: &str) -> Result<(String, Value), UsageError> {
    let (name, raw) = pair
        .split_once(',')
        .ok_or_else(|| UsageError::InvalidField(pair.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(UsageError::InvalidField(pair.to_string()));
    }

    // Objects and arrays are sent as JSON, everything else as a string.
    let value = match raw.trim_start().chars().next() {
        Some('{' | '[') => serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw)),
        _ => Value::from(raw),
    };
    Ok((name.to_string(), value))
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn strip_comment_lines(payload: &str) -> String {
    payload
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') || trimmed.starts_with("//") {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn override_with(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.and_then(non_empty) {
        *slot = Some(value);
    }
}

fn normalize_server(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
