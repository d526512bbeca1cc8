use std::{path::PathBuf, process::ExitCode};

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use jirac_config::{FlagOverrides, OutputFormat};

const COMMANDS_HELP: &str = "\
Commands:
  query JQL...              List issues matching a JQL query
  view KEY                  Show an issue and its comments
  viewfield FIELD KEY       Print a single field of an issue
  comment KEY [TEXT...]     Add a comment (or use --comment)
  transition KEY [STATE...] Move an issue; lists transitions when STATE is omitted
  edit KEY                  Update fields, components and versions
  create                    Create an issue (needs --project, --type, --summary)
  delete KEY                Delete an issue

KEY may be an issue key (PROJ-7) or a numeric issue id (12345).
List flags take NAME to add and -NAME to remove, e.g. --component -legacy.
--columns accepts `default` and `all` as shorthands for column sets.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    Table,
    Tsv,
}

impl From<OutputArg> for OutputFormat {
    fn from(value: OutputArg) -> Self {
        match value {
            OutputArg::Table => OutputFormat::Table,
            OutputArg::Tsv => OutputFormat::Tsv,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "jirac",
    version,
    about = "Query and update Jira issues from the command line",
    after_help = COMMANDS_HELP
)]
pub struct Cli {
    /// Command to run
    #[arg(value_name = "COMMAND")]
    pub command: Option<String>,

    /// Command arguments
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    /// Jira server URL
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long, short = 'u')]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// REST API version (2 or 3)
    #[arg(long)]
    pub api_version: Option<String>,

    /// Issue type, e.g. Bug or Task
    #[arg(long = "type", short = 't')]
    pub issue_type: Option<String>,

    /// Project key
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    #[arg(long, short = 's')]
    pub summary: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'a')]
    pub assignee: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    /// Component to add, or -NAME to remove (repeatable)
    #[arg(long = "component", value_name = "NAME", allow_hyphen_values = true)]
    pub components: Vec<String>,

    /// Fix version to add, or -NAME to remove (repeatable)
    #[arg(long = "fix-version", value_name = "NAME", allow_hyphen_values = true)]
    pub fix_versions: Vec<String>,

    /// Affected version to add, or -NAME to remove (repeatable)
    #[arg(long = "affects-version", value_name = "NAME", allow_hyphen_values = true)]
    pub affects_versions: Vec<String>,

    /// Set any field (repeatable)
    #[arg(long = "field", value_name = "NAME,VALUE", allow_hyphen_values = true)]
    pub fields: Vec<String>,

    /// Comment text
    #[arg(long, short = 'm', allow_hyphen_values = true)]
    pub comment: Option<String>,

    /// Target transition or status name
    #[arg(long)]
    pub state: Option<String>,

    /// Resolution to set while transitioning
    #[arg(long, short = 'r')]
    pub resolution: Option<String>,

    /// Comma-separated columns to display
    #[arg(long, short = 'c', value_name = "COLUMNS")]
    pub columns: Option<String>,

    #[arg(long, value_enum)]
    pub output: Option<OutputArg>,

    /// PEM file with an extra trusted CA certificate
    #[arg(long = "cacert", value_name = "PATH")]
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Log requests, responses and resolved options to stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn into_overrides(self) -> FlagOverrides {
        FlagOverrides {
            positional: self.command.into_iter().chain(self.args).collect(),
            url: self.url,
            username: self.username,
            password: self.password,
            api_version: self.api_version,
            issue_type: self.issue_type,
            project: self.project,
            summary: self.summary,
            description: self.description,
            assignee: self.assignee,
            priority: self.priority,
            components: self.components,
            fix_versions: self.fix_versions,
            affects_versions: self.affects_versions,
            fields: self.fields,
            comment: self.comment,
            state: self.state,
            resolution: self.resolution,
            columns: self.columns,
            output: self.output.map(OutputFormat::from),
            ca_cert: self.ca_cert,
            insecure: self.insecure,
            debug: self.debug,
        }
    }
}

/// Parses process arguments. Help and version exit 0, malformed flags exit 1.
pub fn parse_cli() -> Result<Cli, ExitCode> {
    parse_args(std::env::args_os())
}

pub fn help_text() -> String {
    Cli::command().render_help().to_string()
}

fn parse_args<I, T>(args: I) -> Result<Cli, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(error) => {
            let _ = error.print();
            match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Err(ExitCode::SUCCESS),
                _ => Err(ExitCode::FAILURE),
            }
        }
    }
}
