//! Session error types

use lendhub_core::StorageError;
use thiserror::Error;

/// Failures surfaced by the session store
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid phone number, country or password")]
    InvalidCredentials,

    #[error("Account is suspended")]
    AccountSuspended,

    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("Unknown role: {0}")]
    InvalidRole(String),

    #[error("No user is signed in")]
    NotAuthenticated,

    #[error("Your role does not allow this action")]
    Forbidden,

    #[error("No account with id {0}")]
    UnknownUser(String),

    #[error("Could not save account: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field that failed validation, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            AuthError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// A persisted record that failed to parse or validate
#[derive(Error, Debug)]
pub enum StoredRecordError {
    #[error("Stored record is not valid JSON for its type: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Stored record has invalid '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
