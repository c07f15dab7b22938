use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use reqwest::Url;

use crate::config::StorageConfig;
use crate::error::{ConfigError, StorageError};
use crate::sanitize::redact_key;
use crate::secrets::UrlSigner;

use super::ObjectStore;

/// Checks that a key is a relative, normalized, slash-separated path.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') {
        return Err(invalid("key must be relative"));
    }
    if key.contains('\\') || key.chars().any(char::is_control) {
        return Err(invalid("key contains a forbidden character"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(invalid("key contains an empty segment")),
            "." | ".." => return Err(invalid("key contains a relative segment")),
            _ => {}
        }
    }
    Ok(())
}

/// Object store rooted at a local directory, serving reads through
/// token-signed URLs under `public_base_url`.
pub struct FileObjectStore {
    root: PathBuf,
    public_base_url: String,
    signer: UrlSigner,
}

impl FileObjectStore {
    pub fn new<P: AsRef<Path>>(root: P, public_base_url: &str, signer: UrlSigner) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.to_string(),
            signer,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        let key = config.resolve_signing_key()?;
        let signer = UrlSigner::from_secret(&key).map_err(|source| ConfigError::Secret {
            field: "storage.signing_key",
            source,
        })?;
        Ok(Self::new(&config.root, &config.public_base_url, signer))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, seg| path.join(seg)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Reads the object a signed-URL token grants, if the token is valid.
    pub fn open_signed(&self, token: &str) -> Result<(String, Vec<u8>), StorageError> {
        let key = self
            .signer
            .verify(token, Utc::now())
            .map_err(|e| StorageError::Signing {
                key: "<token>".to_string(),
                reason: e.to_string(),
            })?;
        let bytes = self.download(&key)?;
        Ok((key, bytes))
    }
}

impl ObjectStore for FileObjectStore {
    fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::debug!("Read {} bytes for {}", bytes.len(), redact_key(key));
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::ReadObject {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    /// Writes to a temporary sibling first and renames it into place, so a
    /// reader never sees a partially written object.
    fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            self.ensure_directory(parent)?;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("object");
        let tmp_path = path.with_file_name(format!(
            ".{}.{}.tmp",
            file_name,
            uuid::Uuid::new_v4().simple()
        ));

        let write_err = |e: std::io::Error| StorageError::WriteObject {
            key: key.to_string(),
            source: e,
        };
        std::fs::write(&tmp_path, bytes).map_err(write_err)?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }

        log::debug!(
            "Stored {} bytes ({}) at {}",
            bytes.len(),
            content_type,
            redact_key(key)
        );
        Ok(())
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let signing_err = |reason: String| StorageError::Signing {
            key: key.to_string(),
            reason,
        };

        let token = self
            .signer
            .sign(key, Utc::now() + ttl)
            .map_err(|e| signing_err(e.to_string()))?;

        let mut url = Url::parse(&self.public_base_url)
            .map_err(|e| signing_err(format!("invalid public base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| signing_err("public base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(key.split('/'));
        url.query_pairs_mut().append_pair("token", &token);

        Ok(url.to_string())
    }
}
