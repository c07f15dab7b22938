use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secrets::{has_secret_source, resolve_secret};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub conversion: ConversionConfig,
    pub esign: EsignConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `~/.subsign/data/subsign.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(path) => Some(PathBuf::from(path)),
            None => crate::db::default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory under which object keys are stored.
    pub root: String,
    /// Base URL that serves objects to the e-signature provider.
    pub public_base_url: String,
    #[serde(default)]
    pub signing_key: Option<String>,
    #[serde(default)]
    pub signing_key_file: Option<String>,
    #[serde(default)]
    pub signing_key_env_var: Option<String>,
    #[serde(default = "default_signed_url_ttl_days")]
    pub signed_url_ttl_days: u32,
}

fn default_signed_url_ttl_days() -> u32 {
    7
}

impl StorageConfig {
    pub fn has_signing_key(&self) -> bool {
        has_secret_source(
            self.signing_key.as_deref(),
            self.signing_key_file.as_deref(),
            self.signing_key_env_var.as_deref(),
        )
    }

    /// Resolves the URL signing key (direct → file → env var).
    pub fn resolve_signing_key(&self) -> Result<SecretString, ConfigError> {
        resolve_secret(
            self.signing_key.as_deref(),
            self.signing_key_file.as_deref(),
            self.signing_key_env_var.as_deref(),
        )
        .map_err(|source| ConfigError::Secret {
            field: "storage.signing_key",
            source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub base_url: String,
    #[serde(default = "default_conversion_timeout")]
    pub timeout_secs: u64,
}

fn default_conversion_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsignConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default)]
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_esign_timeout")]
    pub timeout_secs: u64,
}

fn default_esign_timeout() -> u64 {
    30
}

impl EsignConfig {
    pub fn has_api_key(&self) -> bool {
        has_secret_source(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env_var.as_deref(),
        )
    }

    /// Resolves the e-signature API key (direct → file → env var).
    pub fn resolve_api_key(&self) -> Result<SecretString, ConfigError> {
        resolve_secret(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env_var.as_deref(),
        )
        .map_err(|source| ConfigError::Secret {
            field: "esign.api_key",
            source,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Number of investor-side signature blocks on the rendered page.
    #[serde(default = "default_max_signatories")]
    pub max_signatories: usize,
}

fn default_max_signatories() -> usize {
    10
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            max_signatories: default_max_signatories(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Prefix of the in-app link; the subscription id is appended.
    #[serde(default = "default_link_base")]
    pub link_base: String,
}

fn default_link_base() -> String {
    "/subscriptions".to_string()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            link_base: default_link_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `subsign=debug,warn`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
