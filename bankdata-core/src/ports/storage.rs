//! Blob storage port - key to bytes persistence

use async_trait::async_trait;

use crate::domain::result::Result;

/// Key/value blob store
///
/// `put` overwrites any existing object under `key`; there is no versioning.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Backend name (e.g., "local", "gcs")
    fn name(&self) -> &str;

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
}
