//! Blob storage backends
//!
//! - Local directory (atomic replace via temp file)
//! - Google Cloud Storage JSON API media upload
//! - In-memory store for dry runs and tests

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::{Config, StorageSettings};
use crate::domain::result::{Error, Result};
use crate::ports::BlobStorage;

const GCS_UPLOAD_ENDPOINT: &str = "https://storage.googleapis.com/upload/storage/v1";

/// Keys become file names, so they must not escape the target directory
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(Error::storage(format!("Invalid object key: {:?}", key)));
    }
    Ok(())
}

/// Build the backend selected in configuration
pub fn storage_from_config(config: &Config) -> Result<Arc<dyn BlobStorage>> {
    match &config.storage {
        StorageSettings::Local { dir } => {
            let dir = dir
                .clone()
                .ok_or_else(|| Error::config("Local storage directory not set"))?;
            Ok(Arc::new(LocalDirectoryStorage::new(dir)))
        }
        StorageSettings::Gcs {
            bucket,
            access_token,
        } => {
            let token = access_token
                .clone()
                .ok_or_else(|| Error::config("GCS storage requires an access token"))?;
            Ok(Arc::new(GcsStorage::new(
                bucket,
                &token,
                config.request_timeout,
            )?))
        }
    }
}

// =============================================================================
// Local directory
// =============================================================================

/// Writes each object to `<dir>/<key>`
#[derive(Debug, Clone)]
pub struct LocalDirectoryStorage {
    dir: PathBuf,
}

impl LocalDirectoryStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_atomic(dir: &Path, key: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(key))
            .map_err(|e| Error::storage(format!("Failed to replace {}: {}", key, e)))?;
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for LocalDirectoryStorage {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        validate_key(key)?;
        let dir = self.dir.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || Self::write_atomic(&dir, &key, &bytes))
            .await
            .map_err(|e| Error::storage(format!("Write task failed: {}", e)))?
    }
}

// =============================================================================
// Google Cloud Storage
// =============================================================================

/// Uploads objects through the GCS JSON API with a pre-issued OAuth token
#[derive(Debug, Clone)]
pub struct GcsStorage {
    client: Client,
    bucket: String,
    access_token: String,
    endpoint: String,
}

impl GcsStorage {
    pub fn new(bucket: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        Self::with_endpoint(bucket, access_token, timeout, GCS_UPLOAD_ENDPOINT)
    }

    /// Point uploads at a different endpoint (emulators, tests)
    pub fn with_endpoint(
        bucket: &str,
        access_token: &str,
        timeout: Duration,
        endpoint: &str,
    ) -> Result<Self> {
        if bucket.is_empty() {
            return Err(Error::config("GCS bucket name cannot be empty"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            access_token: access_token.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self, key: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/b/{}/o", self.endpoint, self.bucket),
            &[("uploadType", "media"), ("name", key)],
        )
        .map_err(|e| Error::config(format!("Invalid GCS endpoint: {}", e)))
    }
}

#[async_trait]
impl BlobStorage for GcsStorage {
    fn name(&self) -> &str {
        "gcs"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        validate_key(key)?;
        let url = self.upload_url(key)?;
        debug!(bucket = %self.bucket, key, "Uploading object to GCS");

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::storage(format!("GCS upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::storage(format!(
                "GCS upload of {} failed: HTTP {} {}",
                key,
                status.as_u16(),
                body
            )));
        }
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Object held by `MemoryStorage`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Keeps objects in memory; used by `--dry-run` and tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    writes: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of `put` calls, including overwrites
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        validate_key(key)?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}
