//! Error types for the forms binding engine.
//!
//! Everything here is a configuration or programming error and is returned
//! immediately. Validation rejections are not errors; see
//! [`Rejection`](crate::action::Rejection).

use crate::action::Rejection;
use crate::data::DataType;

/// Result type alias for forms operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the forms binding engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No item with this name exists in the record or block.
    #[error("Block '{block}' has no item named '{item}'")]
    UnknownItem { block: String, item: String },

    /// A value was written to an item whose declared type does not accept it.
    #[error("Item '{item}' expects {expected} but was given {got}")]
    TypeMismatch {
        item: String,
        expected: DataType,
        got: &'static str,
    },

    /// The reference record is not in the block's live record list.
    #[error("Record {record} is not part of block '{block}'")]
    NotInBlock { block: String, record: u64 },

    /// The record was not created by this block, so its edits would never
    /// reach it.
    #[error("Record {record} does not belong to block '{block}'")]
    ForeignRecord { block: String, record: u64 },

    /// No block with this name exists in the form.
    #[error("Form '{form}' has no block named '{block}'")]
    UnknownBlock { form: String, block: String },

    /// No renderer factory is registered under this identifier.
    #[error("No renderer registered as '{0}'")]
    UnknownRenderer(String),

    /// A definition's default value cannot be parsed as the item's type.
    #[error("Invalid default value for item '{item}': {message}")]
    InvalidDefaultValue { item: String, message: String },

    /// The definition is malformed.
    #[error("Invalid definition: {0}")]
    Definition(String),

    /// A lifecycle hook vetoed the operation.
    #[error("Action rejected: {0}")]
    ActionRejected(Rejection),
}

impl Error {
    /// Create an unknown item error.
    pub fn unknown_item(block: impl Into<String>, item: impl Into<String>) -> Self {
        Self::UnknownItem {
            block: block.into(),
            item: item.into(),
        }
    }

    /// Create a definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Self::ActionRejected(rejection)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Definition(err.to_string())
    }
}
