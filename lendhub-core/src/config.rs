//! Configuration management

use crate::error::{LendhubError, LendhubResult};
use crate::types::{AuthConfig, LendhubConfig, PwaConfig, StorageBackend, StorageConfig};
use crate::{config_error, validation_error};

use std::path::{Path, PathBuf};

/// Environment variable overriding `storage.data_dir`
pub const DATA_DIR_ENV: &str = "LENDHUB_DATA_DIR";
/// Environment variable toggling `auth.demo_auto_provision`
pub const DEMO_LOGIN_ENV: &str = "LENDHUB_DEMO_LOGIN";

impl Default for LendhubConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig {
                demo_auto_provision: false,
                simulated_latency_ms: 0,
                min_password_length: 6,
            },
            storage: StorageConfig {
                backend: StorageBackend::File,
                data_dir: "~/.lendhub/data".to_string(),
                memory_quota_bytes: None,
            },
            pwa: PwaConfig {
                install_supported: true,
                max_queued_actions: 50,
            },
        }
    }
}

impl LendhubConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> LendhubResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LendhubError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: LendhubConfig = toml::from_str(&content).map_err(|e| LendhubError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Load from `path` when it exists, otherwise defaults; then apply env overrides
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> LendhubResult<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> LendhubResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| LendhubError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| LendhubError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Apply `LENDHUB_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.storage.data_dir = dir;
            }
        }

        if let Ok(flag) = std::env::var(DEMO_LOGIN_ENV) {
            self.auth.demo_auto_provision = matches!(
                flag.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> LendhubResult<()> {
        if self.auth.min_password_length == 0 {
            return Err(validation_error!(
                "min_password_length must be greater than 0",
                "auth.min_password_length",
                "config"
            ));
        }

        if self.storage.backend == StorageBackend::File && self.storage.data_dir.trim().is_empty()
        {
            return Err(config_error!(
                "storage.data_dir is required for the file backend",
                "config"
            ));
        }

        if self.pwa.max_queued_actions == 0 {
            return Err(validation_error!(
                "max_queued_actions must be greater than 0",
                "pwa.max_queued_actions",
                "config"
            ));
        }

        Ok(())
    }

    /// Data directory with a leading `~` expanded to the home directory
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.storage.data_dir)
    }
}

/// Default configuration file location (`<config dir>/lendhub/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lendhub")
        .join("config.toml")
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = LendhubConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.auth.demo_auto_provision);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = LendhubConfig::default();
        config.auth.demo_auto_provision = true;
        config.auth.simulated_latency_ms = 250;
        config.save_to_file(&path).unwrap();

        let loaded = LendhubConfig::from_file(&path).unwrap();
        assert!(loaded.auth.demo_auto_provision);
        assert_eq!(loaded.auth.simulated_latency_ms, 250);
        assert_eq!(loaded.storage.backend, StorageBackend::File);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "auth = [").unwrap();

        let err = LendhubConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, LendhubError::Config { .. }));
    }

    #[test]
    fn test_zero_password_length_rejected() {
        let mut config = LendhubConfig::default();
        config.auth.min_password_length = 0;

        match config.validate() {
            Err(LendhubError::Validation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("auth.min_password_length"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/lib/lendhub"), PathBuf::from("/var/lib/lendhub"));
        assert!(!expand_home("~/data").starts_with("~"));
    }
}
