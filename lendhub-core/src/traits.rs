//! Core trait definitions
//!
//! The client core talks to its host through three narrow seams: a string
//! key-value store, a notification sink and a navigation sink.

use crate::error::StorageError;
use crate::types::NotificationLevel;

/// Persisted string key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Short backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// User-facing notification sink (toasts, banners)
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, level: NotificationLevel);
}

/// Notifier that only records to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, level: NotificationLevel) {
        match level {
            NotificationLevel::Error => tracing::error!(%level, "{}", message),
            NotificationLevel::Warning => tracing::warn!(%level, "{}", message),
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(%level, "{}", message)
            }
        }
    }
}
