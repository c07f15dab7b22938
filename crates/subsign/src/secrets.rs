//! Unified secret resolution and signed-URL tokens.
//!
//! Secrets (the e-signature API key, the URL signing key) are resolved from
//! multiple sources in priority order, supporting flexible deployment:
//!
//! 1. **Direct value** - For quick local testing (e.g., `api_key: "sk-test"`)
//! 2. **File reference** - For Docker secrets pattern (e.g., `api_key_file: /run/secrets/esign`)
//! 3. **Env var reference** - For Kubernetes/production (e.g., `api_key_env_var: ESIGN_API_KEY`)

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fs;

/// Error type for secret resolution and token failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("Decryption error: {0}")]
    DecryptionError(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Token expired at {expired_at}")]
    TokenExpired { expired_at: DateTime<Utc> },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from multiple sources in priority order:
/// 1. Direct value (if provided and non-empty)
/// 2. File contents (if path provided)
/// 3. Environment variable (if name provided)
///
/// # Examples
///
/// ```ignore
/// use subsign::secrets::resolve_secret;
///
/// // Direct value takes priority
/// let key = resolve_secret(Some("sk-test"), Some("/run/secrets/esign"), Some("ESIGN_API_KEY"))?;
///
/// // Env var used as fallback
/// let key = resolve_secret(None, None, Some("ESIGN_API_KEY"))?;
/// ```
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    // Priority 1: Direct value
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    // Priority 2: File
    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            return match fs::read_to_string(&expanded) {
                Ok(content) => Ok(SecretString::from(content.trim().to_string())),
                Err(e) => Err(SecretError::FileReadError {
                    path: expanded,
                    source: e,
                }),
            };
        }
    }

    // Priority 3: Environment variable
    if let Some(var_name) = env_var {
        if !var_name.is_empty() {
            return match std::env::var(var_name) {
                Ok(value) => Ok(SecretString::from(value.trim())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: var_name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: var_name.to_string(),
                }),
            };
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Resolves a secret, returning None if no source is provided instead of an error.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Checks if at least one secret source is configured (non-empty).
pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|s| !s.is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}

/// Expands `~` to the user's home directory.
///
/// Works cross-platform: checks HOME (Unix) then USERPROFILE (Windows).
/// `~user/path` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

// ============================================
// Signed URL tokens
// ============================================

/// Nonce size for AES-256-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Seals `(object key, expiry)` pairs into opaque URL tokens.
///
/// The signing key must be a 64-character hex string (32 bytes). A token is
/// `base64url(<12-byte nonce><ciphertext>)` where the plaintext is
/// `<unix expiry>\n<object key>`; the GCM tag makes it tamper-evident.
pub struct UrlSigner {
    cipher: Aes256Gcm,
}

impl UrlSigner {
    /// Creates a signer from a resolved secret holding the hex key.
    pub fn from_secret(key: &SecretString) -> Result<Self> {
        Self::from_hex_key(key.expose_secret())
    }

    /// Creates a signer from a hex-encoded key.
    pub fn from_hex_key(key_hex: &str) -> Result<Self> {
        let key_bytes = hex_decode(key_hex.trim())
            .map_err(|e| SecretError::InvalidKey(format!("Invalid hex key: {}", e)))?;

        if key_bytes.len() != 32 {
            return Err(SecretError::InvalidKey(format!(
                "Key must be 32 bytes (64 hex chars), got {} bytes",
                key_bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| SecretError::InvalidKey(format!("Failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Produces a token granting access to `object_key` until `expires_at`.
    pub fn sign(&self, object_key: &str, expires_at: DateTime<Utc>) -> Result<String> {
        let plaintext = format!("{}\n{}", expires_at.timestamp(), object_key);
        let nonce_bytes = rand_bytes::<NONCE_SIZE>()?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| SecretError::EncryptionError(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(combined))
    }

    /// Opens a token and returns the object key it grants, provided the
    /// token is authentic and not expired at `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String> {
        let combined = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| SecretError::DecryptionError(format!("Invalid base64: {}", e)))?;

        if combined.len() < NONCE_SIZE {
            return Err(SecretError::DecryptionError("Token too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| SecretError::DecryptionError(e.to_string()))?;
        let plaintext = String::from_utf8(plaintext_bytes)
            .map_err(|e| SecretError::DecryptionError(format!("Invalid UTF-8: {}", e)))?;

        let (expiry, key) = plaintext
            .split_once('\n')
            .ok_or_else(|| SecretError::DecryptionError("Malformed token payload".to_string()))?;
        let expiry: i64 = expiry
            .parse()
            .map_err(|e| SecretError::DecryptionError(format!("Invalid expiry: {}", e)))?;
        let expired_at = Utc
            .timestamp_opt(expiry, 0)
            .single()
            .ok_or_else(|| SecretError::DecryptionError("Expiry out of range".to_string()))?;

        if now >= expired_at {
            return Err(SecretError::TokenExpired { expired_at });
        }

        Ok(key.to_string())
    }
}

/// Decodes hex string to bytes.
fn hex_decode(hex: &str) -> std::result::Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("Hex string must have even length".to_string());
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .ok_or_else(|| format!("Invalid hex at position {}", i))
                .and_then(|pair| {
                    u8::from_str_radix(pair, 16)
                        .map_err(|e| format!("Invalid hex at position {}: {}", i, e))
                })
        })
        .collect()
}

/// Generates random bytes using getrandom.
fn rand_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    getrandom::fill(&mut bytes).map_err(|e| {
        SecretError::EncryptionError(format!("Failed to generate random bytes: {}", e))
    })?;
    Ok(bytes)
}
