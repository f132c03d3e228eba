//! Object storage for uploaded images (Supabase Storage REST API).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use brain_core::{Error, Result};

/// Bucket holding chat images.
pub const DEFAULT_BUCKET: &str = "brain-images";

const STORAGE_TIMEOUT_SECS: u64 = 30;

/// A bucket of publicly readable objects.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `path`. Existing objects are never overwritten.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Remove the objects at `paths`.
    async fn remove(&self, paths: &[String]) -> Result<()>;

    /// Public URL serving the object at `path`.
    fn public_url(&self, path: &str) -> String;

    /// Object path for a public URL produced by [`ObjectStorage::public_url`].
    fn path_from_public_url(&self, url: &str) -> Option<String> {
        public_path(self.bucket(), url)
    }

    fn bucket(&self) -> &str;
}

/// Extract `<key>` from `.../storage/v1/object/public/<bucket>/<key>`.
pub fn public_path(bucket: &str, url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let marker = format!("/storage/v1/object/public/{}/", bucket);
    let path = parsed.path();
    let start = path.find(&marker)? + marker.len();
    let key = &path[start..];
    (!key.is_empty()).then(|| key.to_string())
}

/// Supabase Storage connection settings.
#[derive(Debug, Clone)]
pub struct SupabaseStorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

impl SupabaseStorageConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_key: service_key.into(),
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }
}

/// Supabase Storage client authenticated with the service key.
pub struct SupabaseStorage {
    client: Client,
    config: SupabaseStorageConfig,
}

impl SupabaseStorage {
    pub fn new(config: SupabaseStorageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(STORAGE_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Storage(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.service_key)
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base(),
            self.config.bucket,
            path
        );
        let size = data.len();

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .header("apikey", &self.config.service_key)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to upload image: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Failed to upload image: {} {}",
                status, detail
            )));
        }

        info!(
            subsystem = "pipeline",
            component = "storage",
            op = "upload",
            bucket = %self.config.bucket,
            path = %path,
            size,
            "Object uploaded"
        );
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}", self.base(), self.config.bucket);

        let response = self
            .client
            .delete(&url)
            .header(AUTHORIZATION, self.bearer())
            .header("apikey", &self.config.service_key)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete image: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Failed to delete image: {} {}",
                status, detail
            )));
        }

        debug!(
            subsystem = "pipeline",
            component = "storage",
            op = "remove",
            count = paths.len(),
            "Objects removed"
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base(),
            self.config.bucket,
            path
        )
    }

    fn bucket(&self) -> &str {
        &self.config.bucket
    }
}
