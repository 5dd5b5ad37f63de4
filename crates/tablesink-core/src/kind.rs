//! Table kinds and their system columns
//!
//! Every kind owns a fixed, ordered set of system fields appended after the
//! caller's field list. The templates are produced fresh on each call so no
//! shared state can leak between tables.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::field::FieldDescriptor;

/// What a table records: raw payloads, change history, or plain appends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// No system columns; rows land as given
    Raw,

    /// Change-data-capture history versioned by `_AGE`/`_NO`/`_OP`/`_DT`
    Aged,

    /// Sequence-ordered appends tracked by `_SEQ`/`_NO`/`_OP`
    Normal,
}

impl TableKind {
    /// System fields appended after the caller's fields, in contract order.
    pub fn system_fields(&self) -> Vec<FieldDescriptor> {
        match self {
            Self::Raw => Vec::new(),
            Self::Aged => vec![age_field(), no_field(), op_field(), dt_field()],
            Self::Normal => vec![seq_field(), no_field(), op_field()],
        }
    }

    /// Kind name as the framework spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Aged => "aged",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `_AGE`: which snapshot window a change row belongs to
pub fn age_field() -> FieldDescriptor {
    FieldDescriptor::new("_AGE", &["int", "ui_1"]).with_default(json!(0))
}

/// `_NO`: ordering of changes within one age window
pub fn no_field() -> FieldDescriptor {
    FieldDescriptor::new("_NO", &["int", "ui_1"]).with_default(json!(0))
}

/// `_OP`: operation marker, one of I, U or D
pub fn op_field() -> FieldDescriptor {
    FieldDescriptor::new("_OP", &["char", "c_1"]).with_default(json!(""))
}

/// `_DT`: ingestion timestamp stamped on every log row
pub fn dt_field() -> FieldDescriptor {
    FieldDescriptor::new("_DT", &["datetime"]).with_default(json!(""))
}

/// `_SEQ`: sequence label ordering normal-table appends
pub fn seq_field() -> FieldDescriptor {
    FieldDescriptor::new("_SEQ", &["char", "c_20"]).with_default(json!("0".repeat(20)))
}
