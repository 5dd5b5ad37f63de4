//! Column-name escaping and table-path resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest column name the warehouse accepts
pub const MAX_COLUMN_NAME_LEN: usize = 128;

/// Dataset used when a table path omits its dataset segment
pub const FALLBACK_DATASET: &str = "default";

/// Name prefixes the warehouse reserves for pseudo-columns
const RESERVED_PREFIXES: [&str; 3] = ["_TABLE_", "_FILE_", "_PARTITION"];

/// Turn a proposed column name into a backend-legal one.
///
/// The transformation order is contractual: replace illegal characters,
/// then guard a leading digit, then guard reserved prefixes, then truncate.
/// The prefix checks run against the already-replaced name, so a name whose
/// punctuation collapses into a reserved prefix still gets the guard. The
/// result is not guaranteed stable under re-escaping; callers must escape
/// exactly once.
pub fn escape_column_name(name: &str) -> String {
    let mut escaped: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if escaped.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        escaped.insert(0, '_');
    }

    let upper = escaped.to_ascii_uppercase();
    if RESERVED_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        escaped.insert(0, '_');
    }

    // all-ASCII after replacement, so byte truncation is safe
    escaped.truncate(MAX_COLUMN_NAME_LEN);
    escaped
}

/// A table path with no table component is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("table path '{0}' has no table component")]
pub struct TablePathError(pub String);

/// A logical `[project.]dataset.table` path as the caller wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePath {
    /// Project segment, `None` when absent or empty
    pub project: Option<String>,

    /// Dataset segment, `None` when absent or empty
    pub dataset: Option<String>,

    /// Table name, always the last path component
    pub table: String,
}

impl TablePath {
    /// Split a dot-separated path into its segments.
    ///
    /// One segment is a bare table name, two are `dataset.table`, three or
    /// more resolve as first/second/last component. Empty project or
    /// dataset segments mean "use the default". An empty table component
    /// is malformed.
    pub fn parse(path: &str) -> Result<Self, TablePathError> {
        let parts: Vec<&str> = path.split('.').collect();
        let (project, dataset, table) = match parts.as_slice() {
            [table] => (None, None, *table),
            [dataset, table] => (None, Some(*dataset), *table),
            [project, dataset, .., table] => (Some(*project), Some(*dataset), *table),
            [] => (None, None, ""),
        };

        if table.is_empty() {
            return Err(TablePathError(path.to_string()));
        }

        let non_empty = |s: &str| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };

        Ok(Self {
            project: project.and_then(non_empty),
            dataset: dataset.and_then(non_empty),
            table: table.to_string(),
        })
    }

    /// Fill the omitted segments with the adaptor's defaults.
    pub fn resolve(&self, default_project: &str, fallback_dataset: &str) -> TableReference {
        TableReference {
            project: self
                .project
                .clone()
                .unwrap_or_else(|| default_project.to_string()),
            dataset: self
                .dataset
                .clone()
                .unwrap_or_else(|| fallback_dataset.to_string()),
            table: self.table.clone(),
        }
    }
}

/// A fully qualified table in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableReference {
    /// Project name
    pub project: String,

    /// Dataset name
    pub dataset: String,

    /// Table name
    pub table: String,
}

impl TableReference {
    /// Create a new table reference
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}
