//! Error types.

use crate::tag::TagSyntaxError;

/// Errors that can occur when deriving metadata or accessing field values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("field `{field}`: {source}")]
    TagSyntax {
        field: String,
        #[source]
        source: TagSyntaxError,
    },

    /// The field is embedded or interface shaped and cannot be read as a
    /// plain named field.
    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("unexported field: {0}")]
    UnexportedField(String),

    #[error("type mismatch on field `{field}`: expected {expected}")]
    TypeMismatch { field: String, expected: String },
}

impl Error {
    pub fn is_tag_syntax(&self) -> bool {
        matches!(self, Error::TagSyntax { .. })
    }

    pub fn is_invalid_field(&self) -> bool {
        matches!(self, Error::InvalidField(_))
    }

    pub fn is_unexported_field(&self) -> bool {
        matches!(self, Error::UnexportedField(_))
    }
}

/// Result type for refract operations.
pub type Result<T> = std::result::Result<T, Error>;
