//! Configuration management infrastructure.
//!
//! TOML-backed settings for the verification stack: OCSP behavior, trust
//! material and the pdfsig timeout. The same options are available
//! programmatically through [`TrustStoreBuilder`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infra::error::{ProcessorError, ProcessorResult};
use crate::trust::TrustStoreBuilder;

/// Processor settings with their file representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfiguration {
    /// Demote OCSP failures to warnings
    pub soft_fail: bool,

    /// Timeout per OCSP responder exchange, seconds
    pub ocsp_timeout_secs: u64,

    /// Lifetime of cached OCSP verdicts, seconds
    pub ocsp_cache_ttl_secs: u64,

    /// Additional trusted roots (PEM file)
    pub custom_ca_path: Option<PathBuf>,

    /// Bound on one pdfsig invocation, seconds
    pub pdfsig_timeout_secs: u64,
}

impl Default for ProcessorConfiguration {
    fn default() -> Self {
        ProcessorConfiguration {
            soft_fail: false,
            ocsp_timeout_secs: 10,
            ocsp_cache_ttl_secs: 3600,
            custom_ca_path: None,
            pdfsig_timeout_secs: 30,
        }
    }
}

impl ProcessorConfiguration {
    /// Trust store builder pre-populated from these settings
    #[must_use]
    pub fn trust_store_builder(&self) -> TrustStoreBuilder {
        let mut builder = TrustStoreBuilder::default()
            .soft_fail(self.soft_fail)
            .ocsp_timeout(Duration::from_secs(self.ocsp_timeout_secs))
            .ocsp_cache_ttl(Duration::from_secs(self.ocsp_cache_ttl_secs));
        if let Some(path) = &self.custom_ca_path {
            builder = builder.custom_ca_file(path);
        }
        builder
    }

    #[must_use]
    pub fn pdfsig_timeout(&self) -> Duration {
        Duration::from_secs(self.pdfsig_timeout_secs)
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager with the default per-user path
    pub fn new() -> ProcessorResult<Self> {
        Ok(ConfigManager {
            config_path: Self::default_config_path()?,
        })
    }

    /// Manager with a custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        ConfigManager {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Default configuration file path
    pub fn default_config_path() -> ProcessorResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("einvoice-processor").join("config.toml"))
        } else {
            Ok(PathBuf::from("einvoice-processor.toml"))
        }
    }

    /// Load the configuration, creating the default file if absent
    pub fn load_or_create_default(&self) -> ProcessorResult<ProcessorConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = ProcessorConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> ProcessorResult<ProcessorConfiguration> {
        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            ProcessorError::Configuration(format!(
                "failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: ProcessorConfiguration = toml::from_str(&content).map_err(|e| {
            ProcessorError::Configuration(format!("failed to parse config file: {e}"))
        })?;

        self.validate(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &ProcessorConfiguration) -> ProcessorResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProcessorError::Configuration(format!(
                    "failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            ProcessorError::Configuration(format!("failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            ProcessorError::Configuration(format!(
                "failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })?;
        Ok(())
    }

    fn validate(&self, config: &ProcessorConfiguration) -> ProcessorResult<()> {
        if config.ocsp_timeout_secs == 0 {
            return Err(ProcessorError::Configuration(
                "OCSP timeout must be greater than 0".to_string(),
            ));
        }
        if config.pdfsig_timeout_secs == 0 {
            return Err(ProcessorError::Configuration(
                "pdfsig timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = ProcessorConfiguration::default();
        assert!(!config.soft_fail);
        assert_eq!(config.ocsp_timeout_secs, 10);
        assert_eq!(config.ocsp_cache_ttl_secs, 3600);
        assert_eq!(config.pdfsig_timeout_secs, 30);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ProcessorConfiguration {
            soft_fail: true,
            custom_ca_path: Some(PathBuf::from("/etc/ssl/extra-roots.pem")),
            ..ProcessorConfiguration::default()
        };
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: ProcessorConfiguration = toml::from_str(&toml_str).unwrap();
        assert!(deserialized.soft_fail);
        assert_eq!(deserialized.custom_ca_path, config.custom_ca_path);
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());

        let loaded = manager.load().unwrap();
        assert_eq!(config.ocsp_timeout_secs, loaded.ocsp_timeout_secs);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(
            &config_path,
            "soft_fail = false\nocsp_timeout_secs = 0\nocsp_cache_ttl_secs = 60\npdfsig_timeout_secs = 30\n",
        )
        .unwrap();
        let err = ConfigManager::with_path(&config_path).load().unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }
}
