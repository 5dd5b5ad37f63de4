//! Column definitions and ordered schema projection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::UnsupportedTypeError;
use crate::field::{FieldDescriptor, StorageType};
use crate::kind::TableKind;
use crate::naming::escape_column_name;

/// A record as the framework hands it over: field name to JSON value,
/// keys not yet escaped
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Whether a column must carry a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnMode {
    /// Key columns: a value is mandatory
    Required,

    /// Everything else
    Nullable,
}

impl ColumnMode {
    /// Mode name as the warehouse spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Nullable => "NULLABLE",
        }
    }
}

impl fmt::Display for ColumnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A backend column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Escaped, backend-legal column name
    pub name: String,

    /// Resolved storage type
    pub storage_type: StorageType,

    /// Required or nullable, derived from the field's key flag
    pub mode: ColumnMode,

    /// Description passthrough
    #[serde(default)]
    pub description: Option<String>,
}

impl ColumnDef {
    /// Create a nullable column
    pub fn new(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            storage_type,
            mode: ColumnMode::Nullable,
            description: None,
        }
    }

    /// Set the mode
    pub fn with_mode(mut self, mode: ColumnMode) -> Self {
        self.mode = mode;
        self
    }

    /// Project one field descriptor into a column definition.
    pub fn from_field(field: &FieldDescriptor) -> Result<Self, UnsupportedTypeError> {
        Ok(Self {
            name: escape_column_name(&field.field_name),
            storage_type: field.storage_type()?,
            mode: if field.key_flag {
                ColumnMode::Required
            } else {
                ColumnMode::Nullable
            },
            description: field.description.clone(),
        })
    }
}

/// An ordered list of column definitions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    /// Columns in projection order
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Create a schema from columns
    pub fn from_columns(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Project user fields plus the kind's system fields into a schema.
///
/// Order is preserved exactly: callers diff schemas positionally, so the
/// user's fields come first in the given order, then the kind's system
/// fields in their contract order.
pub fn project_schema(
    fields: &[FieldDescriptor],
    kind: TableKind,
) -> Result<TableSchema, UnsupportedTypeError> {
    let system = kind.system_fields();
    let mut columns = Vec::with_capacity(fields.len() + system.len());
    for field in fields {
        columns.push(ColumnDef::from_field(field)?);
    }
    for field in &system {
        columns.push(ColumnDef::from_field(field)?);
    }
    Ok(TableSchema::from_columns(columns))
}
