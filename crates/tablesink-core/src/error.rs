//! Error types shared across the workspace

use thiserror::Error;

/// A type chain named no recognized storage tag.
///
/// This is the one per-call condition that propagates as an `Err` instead of
/// an operational `false`: the field can never be stored, so retrying the
/// call cannot help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field_name}': no recognized storage tag in type chain {chain:?}")]
pub struct UnsupportedTypeError {
    /// Field whose chain failed to resolve
    pub field_name: String,

    /// The offending type chain, least to most specific
    pub chain: Vec<String>,
}
