//! Validation error model.

use thiserror::Error;

/// Result type used at message boundaries.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A message failed structural validation.
///
/// Raised for **batch-level** problems only (missing jurisdiction, bad frame range,
/// wrong schema). A batch that fails validation is rejected as a whole; per-person
/// problems are reported separately by the decoder and never surface as this error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field is present but has the wrong type or an out-of-range value.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// `frame_end` precedes `frame_start`.
    #[error("frame range is inverted (start: {start}, end: {end})")]
    FrameRange { start: u64, end: u64 },

    /// The message carries a schema the receiver does not accept.
    #[error("unexpected schema `{found}` (expected {expected})")]
    UnexpectedSchema { expected: &'static str, found: String },

    /// The message body is not a JSON object.
    #[error("message body must be a JSON object")]
    NotAnObject,
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::MissingField(field)
    }

    pub fn unexpected_schema(expected: &'static str, found: impl Into<String>) -> Self {
        Self::UnexpectedSchema {
            expected,
            found: found.into(),
        }
    }
}
