//! Field descriptors and storage-type resolution
//!
//! The pipeline framework describes every field with an ordered `type_chain`
//! running from the least specific tag to the most specific one, e.g.
//! `["char", "c_8"]` for an 8-character string. Resolution scans the chain
//! from the most specific end and returns the storage type bound to the
//! first recognized tag, so refinements like `c_8` fall back to their base
//! tag without widening the table of known tags.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::UnsupportedTypeError;

/// Backend-neutral storage type a column resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageType {
    /// Placeholder type for fields that carry no value
    Null,

    /// Integer of any width
    Integer,

    /// Floating point of any width
    Float,

    /// Text
    String,

    /// Raw bytes
    Bytes,

    /// Calendar date, no time component
    Date,

    /// Wall-clock time, no date component
    Time,

    /// Date and time
    Datetime,

    /// Boolean
    Boolean,
}

impl StorageType {
    /// Look a logical tag up in the fixed tag table.
    ///
    /// Unrecognized tags (including refinements like `c_8` or `ui_2`)
    /// return `None` so resolution can keep scanning the chain.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "null" => Some(Self::Null),
            "int" => Some(Self::Integer),
            "real" => Some(Self::Float),
            "char" => Some(Self::String),
            "blob" => Some(Self::Bytes),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "datetime" => Some(Self::Datetime),
            "bool" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Storage type name as the warehouse spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::Bytes => "BYTES",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Datetime => "DATETIME",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A field as the pipeline framework describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name before escaping
    pub field_name: String,

    /// Part of the record key; projects to a REQUIRED column
    #[serde(default)]
    pub key_flag: bool,

    /// Ordered type tags, least to most specific. Never empty.
    pub type_chain: Vec<String>,

    /// Source format hint, passed through untouched
    #[serde(default)]
    pub format: Option<String>,

    /// Source encoding hint, passed through untouched
    #[serde(default)]
    pub encode: Option<String>,

    /// Default value for the field
    #[serde(default)]
    pub default: Value,

    /// Column description, passed through to the warehouse
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Create a descriptor with the given name and type chain
    pub fn new(field_name: impl Into<String>, type_chain: &[&str]) -> Self {
        Self {
            field_name: field_name.into(),
            key_flag: false,
            type_chain: type_chain.iter().map(|t| t.to_string()).collect(),
            format: None,
            encode: None,
            default: Value::Null,
            description: None,
        }
    }

    /// Set the key flag
    pub fn with_key_flag(mut self, key_flag: bool) -> Self {
        self.key_flag = key_flag;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Resolve the storage type: rightmost recognized tag wins.
    pub fn storage_type(&self) -> Result<StorageType, UnsupportedTypeError> {
        self.type_chain
            .iter()
            .rev()
            .find_map(|tag| StorageType::from_tag(tag))
            .ok_or_else(|| UnsupportedTypeError {
                field_name: self.field_name.clone(),
                chain: self.type_chain.clone(),
            })
    }
}
