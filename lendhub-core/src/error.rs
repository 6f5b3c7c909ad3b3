//! Error types for the core crate
//!
//! `StorageError` is what key-value backends return. `LendhubError` covers
//! loading and validating configuration, carrying an [`ErrorContext`] with
//! hints for the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub type LendhubResult<T> = Result<T, LendhubError>;

/// Where an error happened and what the user can do about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Correlates the log line with what the user saw
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub operation: Option<String>,
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Failures raised by a key-value storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Configuration failures
#[derive(Error, Debug)]
pub enum LendhubError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LendhubError {
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            LendhubError::Config { context, .. } | LendhubError::Validation { context, .. } => {
                Some(context)
            }
            LendhubError::Io(_) => None,
        }
    }

    /// Log the error together with its id and suggestions
    pub fn log(&self) {
        match self.context() {
            Some(context) => error!(
                error_id = %context.error_id,
                component = %context.component,
                suggestions = ?context.recovery_suggestions,
                error = %self,
                "Configuration error"
            ),
            None => error!(error = %self, "Configuration IO error"),
        }
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::LendhubError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'lendhub config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::LendhubError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_error_names_key() {
        let err = StorageError::QuotaExceeded {
            key: "lendhub.users".to_string(),
            needed: 120,
            available: 10,
        };
        let message = err.to_string();
        assert!(message.contains("lendhub.users"));
        assert!(message.contains("quota exceeded"));
    }

    #[test]
    fn test_config_macro_carries_suggestions() {
        let err = config_error!("bad value", "config");
        let context = err.context().unwrap();
        assert_eq!(context.component, "config");
        assert_eq!(context.recovery_suggestions.len(), 2);
    }

    #[test]
    fn test_io_error_has_no_context() {
        let err: LendhubError = std::io::Error::other("disk gone").into();
        assert!(err.context().is_none());
    }
}
