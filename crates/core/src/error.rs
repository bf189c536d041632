//! Errors raised while turning raw text into domain values.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Parse failures for identifiers and enumerations.
///
/// Form validation reports through [`FieldErrors`](crate::FieldErrors)
/// instead, since it collects one message per field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid user id '{raw}': {reason}")]
    InvalidId { raw: String, reason: String },

    #[error("unknown role '{0}' (expected admin, manager or employee)")]
    UnknownRole(String),
}

impl DomainError {
    pub fn invalid_id(raw: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidId {
            raw: raw.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unknown_role(raw: impl Into<String>) -> Self {
        Self::UnknownRole(raw.into())
    }
}
