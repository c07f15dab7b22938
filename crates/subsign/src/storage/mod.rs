pub mod object_store;

use chrono::Duration;

use crate::error::StorageError;

pub use object_store::FileObjectStore;

/// Blob storage holding document bytes.
pub trait ObjectStore: Send + Sync {
    fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Returns a URL granting read access to `key` for `ttl`.
    fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}
