//! Configuration for the bridge core
//!
//! Stored as TOML. Every field has a default, so an empty file is a valid
//! configuration: in-memory key store, 2048-bit RSA key pair, persisted AES
//! key for `generate_aes_key`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cmt_crypto::{SymmetricKeyPolicy, DEFAULT_KEY_PAIR_ALIAS, DEFAULT_SYMMETRIC_KEY_ALIAS};

use crate::file_store::validate_alias;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Bridge configuration
///
/// # Example TOML
///
/// ```toml
/// [keystore]
/// backend = "file"   # "memory" | "file"
/// dir = "/data/cmt/keys"
///
/// [keys]
/// key_pair_alias = "cmt.client.rsa"
/// rsa_bits = 2048
/// aes_policy = "persistent"  # "ephemeral" | "persistent"
/// aes_alias = "cmt.client.aes"
///
/// [logging]
/// level = "warn"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub keystore: KeyStoreConfig,

    #[serde(default)]
    pub keys: KeysConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where key material is kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreConfig {
    /// "memory" or "file"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Key directory, required for the file backend
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_backend() -> String {
    "memory".to_string()
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dir: None,
        }
    }
}

/// Key aliases and sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_key_pair_alias")]
    pub key_pair_alias: String,

    /// RSA modulus size for generated key pairs
    #[serde(default = "default_rsa_bits")]
    pub rsa_bits: usize,

    /// "ephemeral" or "persistent"; only affects `generate_aes_key`
    #[serde(default = "default_aes_policy")]
    pub aes_policy: String,

    #[serde(default = "default_aes_alias")]
    pub aes_alias: String,
}

fn default_key_pair_alias() -> String {
    DEFAULT_KEY_PAIR_ALIAS.to_string()
}

fn default_rsa_bits() -> usize {
    2048
}

fn default_aes_policy() -> String {
    "persistent".to_string()
}

fn default_aes_alias() -> String {
    DEFAULT_SYMMETRIC_KEY_ALIAS.to_string()
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            key_pair_alias: default_key_pair_alias(),
            rsa_bits: default_rsa_bits(),
            aes_policy: default_aes_policy(),
            aes_alias: default_aes_alias(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl BridgeConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// In-memory configuration with the default aliases
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration rooted at `dir`
    pub fn with_file_store(dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.keystore.backend = "file".to_string();
        config.keystore.dir = Some(dir.into());
        config
    }

    /// Policy for keys produced by `generate_aes_key`
    pub fn symmetric_policy(&self) -> SymmetricKeyPolicy {
        match self.keys.aes_policy.as_str() {
            "persistent" => SymmetricKeyPolicy::Persistent {
                alias: self.keys.aes_alias.clone(),
            },
            _ => SymmetricKeyPolicy::Ephemeral,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_backends = ["memory", "file"];
        if !valid_backends.contains(&self.keystore.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid keystore backend '{}'. Valid values: {:?}",
                self.keystore.backend, valid_backends
            )));
        }

        if self.keystore.backend == "file" {
            let missing = self
                .keystore
                .dir
                .as_ref()
                .map_or(true, |d| d.as_os_str().is_empty());
            if missing {
                return Err(ConfigError::ValidationError(
                    "keystore.dir is required for the file backend".to_string(),
                ));
            }
        }

        let valid_bits = [2048, 3072, 4096];
        if !valid_bits.contains(&self.keys.rsa_bits) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid rsa_bits {}. Valid values: {:?}",
                self.keys.rsa_bits, valid_bits
            )));
        }

        let valid_policies = ["ephemeral", "persistent"];
        if !valid_policies.contains(&self.keys.aes_policy.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid aes_policy '{}'. Valid values: {:?}",
                self.keys.aes_policy, valid_policies
            )));
        }

        for alias in [&self.keys.key_pair_alias, &self.keys.aes_alias] {
            validate_alias(alias).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        let public_alias = format!("{}.pub", self.keys.key_pair_alias);
        if self.keys.aes_alias == self.keys.key_pair_alias || self.keys.aes_alias == public_alias {
            return Err(ConfigError::ValidationError(format!(
                "aes_alias '{}' collides with the key pair alias",
                self.keys.aes_alias
            )));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}'. Valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}
