//! Core data type definitions

use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendhubConfig {
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub pwa: PwaConfig,
}

/// Authentication behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Provision a demo borrower when login credentials match nobody.
    /// Off by default: a mismatch is rejected.
    pub demo_auto_provision: bool,
    /// Fixed delay applied to login and registration to model a round trip
    pub simulated_latency_ms: u64,
    /// Minimum accepted password length at registration
    pub min_password_length: usize,
}

/// Where the key-value store lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory holding the file-backed store
    pub data_dir: String,
    /// Byte quota for the in-memory backend (None = unlimited)
    pub memory_quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

/// Installability and offline handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwaConfig {
    /// Whether the host supports install prompts at all
    pub install_supported: bool,
    /// Maximum number of actions kept while offline; oldest are dropped first
    pub max_queued_actions: usize,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationLevel::Info => write!(f, "info"),
            NotificationLevel::Success => write!(f, "success"),
            NotificationLevel::Warning => write!(f, "warning"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}
