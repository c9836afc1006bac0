// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Configuration
//!
//! YAML configuration for the audit core and its operator tool.
//!
//! ```yaml
//! storage:
//!   backend: sled
//!   path: ./tenant-audit-data
//! ingestion:
//!   max_batch_size: 1000
//! integrity:
//!   fail_on_violation: true
//! event_bus:
//!   capacity: 1000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::repository::{SledConfig, StorageBackend};

pub const CONFIG_PATH_ENV: &str = "TENANT_AUDIT_CONFIG_PATH";
pub const STORAGE_PATH_ENV: &str = "TENANT_AUDIT_STORAGE_PATH";
pub const MAX_BATCH_SIZE_ENV: &str = "TENANT_AUDIT_MAX_BATCH_SIZE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub event_bus: EventBusConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    InMemory,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Database directory, used by the sled backend
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./tenant-audit-data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sled,
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Capacity of the bounded collector used for bulk drains
    pub max_batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { max_batch_size: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// Treat any integrity finding as a failure (operator tool exit status)
    pub fail_on_violation: bool,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self { fail_on_violation: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBusConfig {
    pub capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

impl AuditConfig {
    /// Configuration backed by memory only, for tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            storage: StorageConfig {
                backend: BackendKind::InMemory,
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. TENANT_AUDIT_CONFIG_PATH environment variable
    /// 2. ./tenant-audit.yaml (working directory)
    /// 3. ~/.tenant-audit/config.yaml (user home)
    /// 4. /etc/tenant-audit/config.yaml (Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./tenant-audit.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".tenant-audit").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/tenant-audit/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(STORAGE_PATH_ENV) {
            tracing::info!("Environment override: {}={}", STORAGE_PATH_ENV, path);
            self.storage.path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var(MAX_BATCH_SIZE_ENV) {
            match val.parse::<usize>() {
                Ok(size) => {
                    tracing::info!("Environment override: {}={}", MAX_BATCH_SIZE_ENV, size);
                    self.ingestion.max_batch_size = size;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for {}: '{}'. Expected an integer. Ignoring.",
                        MAX_BATCH_SIZE_ENV,
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.backend == BackendKind::Sled && self.storage.path.as_os_str().is_empty() {
            anyhow::bail!("storage.path cannot be empty for the sled backend");
        }
        if self.event_bus.capacity == 0 {
            anyhow::bail!("event_bus.capacity must be greater than zero");
        }
        Ok(())
    }

    pub fn storage_backend(&self) -> StorageBackend {
        match self.storage.backend {
            BackendKind::InMemory => StorageBackend::InMemory,
            BackendKind::Sled => StorageBackend::Sled(SledConfig {
                path: self.storage.path.clone(),
            }),
        }
    }
}
