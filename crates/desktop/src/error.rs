//! Client error taxonomy.

use thiserror::Error;

use erpdesk_auth::AuthzError;
use erpdesk_core::FieldErrors;

use crate::storage::StorageError;

/// Coarse classification used to pick the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials, or the session can no longer be refreshed.
    Authentication,
    /// Local input check failed; no request was made.
    Validation,
    /// Any other failure. Local state is left as it was so the user can retry.
    Network,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid credentials")]
    Authentication,

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Authentication => ErrorKind::Authentication,
            ClientError::Validation(_) | ClientError::InvalidAction(_) => ErrorKind::Validation,
            ClientError::Forbidden(_)
            | ClientError::Network(_)
            | ClientError::Api { .. }
            | ClientError::Decode(_)
            | ClientError::Storage(_) => ErrorKind::Network,
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.kind() == ErrorKind::Authentication
    }

    /// Field errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ClientError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
