use thiserror::Error;

use crate::OptionSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Query,
    View,
    ViewField,
    Comment,
    Transition,
    Edit,
    Create,
    Delete,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("no command given")]
    MissingCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("unexpected arguments for {command}: {extra}")]
    UnexpectedArguments {
        command: &'static str,
        extra: String,
    },
    #[error("invalid --field value '{0}', expected NAME,VALUE")]
    InvalidField(String),
    #[error("{command} requires: {}", .missing.join(", "))]
    MissingFields {
        command: &'static str,
        missing: Vec<&'static str>,
    },
}

impl Command {
    #[cfg(test)]
    pub(crate) const ALL: [Command; 8] = [
        Command::Query,
        Command::View,
        Command::ViewField,
        Command::Comment,
        Command::Transition,
        Command::Edit,
        Command::Create,
        Command::Delete,
    ];

    pub fn parse(name: &str) -> Result<Self, UsageError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "query" | "search" => Ok(Self::Query),
            "view" | "show" => Ok(Self::View),
            "viewfield" | "field" => Ok(Self::ViewField),
            "comment" => Ok(Self::Comment),
            "transition" => Ok(Self::Transition),
            "edit" => Ok(Self::Edit),
            "create" => Ok(Self::Create),
            "delete" | "rm" => Ok(Self::Delete),
            _ => Err(UsageError::UnknownCommand(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::View => "view",
            Self::ViewField => "viewfield",
            Self::Comment => "comment",
            Self::Transition => "transition",
            Self::Edit => "edit",
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

/// Runs before any remote call is attempted.
pub fn validate(command: Command, options: &OptionSet) -> Result<(), UsageError> {
    let mut missing = Vec::new();

    match command {
        Command::Query => {
            require(&mut missing, "jql", options.jql.as_deref());
        }
        Command::View | Command::Transition | Command::Edit | Command::Delete => {
            require(&mut missing, "issueKey", options.issue_key.as_deref());
        }
        Command::ViewField => {
            require(&mut missing, "fieldName", options.field_name.as_deref());
            require(&mut missing, "issueKey", options.issue_key.as_deref());
        }
        Command::Comment => {
            require(&mut missing, "issueKey", options.issue_key.as_deref());
            require(&mut missing, "commentText", options.comment.as_deref());
        }
        Command::Create => {
            require(&mut missing, "project", options.project.as_deref());
            require(&mut missing, "issueType", options.issue_type.as_deref());
            require(&mut missing, "summary", options.summary_text());
        }
    }

    if missing.is_empty() {
        return Ok(());
    }
    Err(UsageError::MissingFields {
        command: command.name(),
        missing,
    })
}

fn require(missing: &mut Vec<&'static str>, name: &'static str, value: Option<&str>) {
    if value.map(str::trim).unwrap_or_default().is_empty() {
        missing.push(name);
    }
}
