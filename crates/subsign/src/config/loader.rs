use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    for (field, url) in [
        ("storage.public_base_url", &config.storage.public_base_url),
        ("conversion.base_url", &config.conversion.base_url),
        ("esign.base_url", &config.esign.base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation {
                message: format!("{} must be an http(s) URL, got '{}'", field, url),
            });
        }
    }

    if !config.storage.has_signing_key() {
        return Err(ConfigError::Validation {
            message: "storage needs one of signing_key, signing_key_file or signing_key_env_var"
                .to_string(),
        });
    }

    if !config.esign.has_api_key() {
        return Err(ConfigError::Validation {
            message: "esign needs one of api_key, api_key_file or api_key_env_var".to_string(),
        });
    }

    if config.storage.signed_url_ttl_days == 0 {
        return Err(ConfigError::Validation {
            message: "storage.signed_url_ttl_days must be at least 1".to_string(),
        });
    }

    if config.signing.max_signatories == 0 {
        return Err(ConfigError::Validation {
            message: "signing.max_signatories must be at least 1".to_string(),
        });
    }

    Ok(())
}
