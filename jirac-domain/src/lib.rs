//! Column registry and projection of raw Jira issue JSON into display rows.

mod column;
mod comment;
mod projector;
mod text;

pub use column::{
    extract, format, registered_columns, weight, FormatError, RawValue, Weight,
    DEFAULT_COLUMNS, PLACEHOLDER,
};
pub use comment::{comment_id, project_comment, COMMENT_HEADER};
pub use projector::{field_value, header, project, project_all, project_labeled, sort_columns};
