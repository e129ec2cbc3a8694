//! Artifact store client.

use crate::memory::InMemoryArtifactStore;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stylebatch_config::{StorageBackend, StorageConfig};
use stylebatch_core::{BatchError, BatchResult, Interface};
use tracing::{debug, info};

/// Largest number of paths one bulk delete may carry.
pub const MAX_DELETE_BATCH: usize = 100;

/// An object found by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Full path inside the bucket.
    pub path: String,
    /// Size in bytes, when the store reports it.
    pub size: Option<u64>,
}

/// Object storage for generated artifacts.
#[async_trait]
pub trait ArtifactStore: Interface + Send + Sync {
    /// Bucket this store writes to.
    fn bucket(&self) -> &str;

    /// Uploads `bytes` to `path`, replacing any existing object, and
    /// returns the public URL.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> BatchResult<String>;

    /// Deletes up to [`MAX_DELETE_BATCH`] objects. Returns how many the
    /// store reported as removed; missing paths are not an error.
    async fn delete(&self, paths: &[String]) -> BatchResult<u64>;

    /// Lists every object whose path starts with `prefix`, across pages.
    async fn list(&self, prefix: &str) -> BatchResult<Vec<StoredObject>>;
}

/// Builds the artifact store selected by configuration.
pub fn build_artifact_store(config: &StorageConfig) -> BatchResult<Arc<dyn ArtifactStore>> {
    match config.backend {
        StorageBackend::Http => Ok(Arc::new(HttpArtifactStore::new(config)?)),
        StorageBackend::Memory => Ok(Arc::new(InMemoryArtifactStore::new(&config.bucket))),
    }
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    prefixes: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListBody<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    /// Folders come back without an id.
    id: Option<String>,
    metadata: Option<EntryMetadata>,
}

#[derive(Debug, Deserialize)]
struct EntryMetadata {
    size: Option<u64>,
}

/// HTTP object storage client (Supabase Storage API).
///
/// - upload: `POST {base}/object/{bucket}/{path}` with `x-upsert: true`
/// - delete: `DELETE {base}/object/{bucket}` with `{"prefixes": [...]}`
/// - list: `POST {base}/object/list/{bucket}`, paginated by offset
///
/// Public URLs are `{public_base}/object/public/{bucket}/{path}`.
pub struct HttpArtifactStore {
    client: reqwest::Client,
    base_url: String,
    public_base_url: String,
    bucket: String,
    service_key: String,
    page_size: u32,
}

impl HttpArtifactStore {
    /// Creates a store from configuration.
    pub fn new(config: &StorageConfig) -> BatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BatchError::Configuration(format!("storage client: {e}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let public_base_url = config
            .public_base_url
            .as_deref()
            .map_or_else(|| base_url.clone(), |u| u.trim_end_matches('/').to_string());

        Ok(Self {
            client,
            base_url,
            public_base_url,
            bucket: config.bucket.clone(),
            service_key: config.service_key.clone(),
            page_size: config.list_page_size.max(1),
        })
    }

    /// Public URL of an object.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.public_base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    async fn ensure_success(response: reqwest::Response) -> BatchResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(BatchError::Storage(format!(
            "storage responded {}: {}",
            status.as_u16(),
            body
        )))
    }

    fn transport_error(err: &reqwest::Error) -> BatchError {
        BatchError::Storage(format!("storage request failed: {err}"))
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> BatchResult<String> {
        let path = path.trim_start_matches('/');
        debug!(bucket = %self.bucket, path = %path, size = bytes.len(), "Uploading artifact");

        let request = self
            .client
            .post(format!("{}/object/{}/{}", self.base_url, self.bucket, path))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        Self::ensure_success(response).await?;

        Ok(self.public_url(path))
    }

    async fn delete(&self, paths: &[String]) -> BatchResult<u64> {
        if paths.is_empty() {
            return Ok(0);
        }
        if paths.len() > MAX_DELETE_BATCH {
            return Err(BatchError::validation(format!(
                "at most {MAX_DELETE_BATCH} paths per delete, got {}",
                paths.len()
            )));
        }

        let request = self
            .client
            .delete(format!("{}/object/{}", self.base_url, self.bucket))
            .json(&DeleteBody { prefixes: paths });

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;
        let removed: Vec<serde_json::Value> = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        info!(bucket = %self.bucket, requested = paths.len(), removed = removed.len(), "Deleted artifacts");
        Ok(removed.len() as u64)
    }

    async fn list(&self, prefix: &str) -> BatchResult<Vec<StoredObject>> {
        let prefix = prefix.trim_matches('/');
        let mut objects = Vec::new();
        let mut offset = 0u32;

        loop {
            let request = self
                .client
                .post(format!("{}/object/list/{}", self.base_url, self.bucket))
                .json(&ListBody {
                    prefix,
                    limit: self.page_size,
                    offset,
                    sort_by: SortBy {
                        column: "name",
                        order: "asc",
                    },
                });

            let response = self
                .authorized(request)
                .send()
                .await
                .map_err(|e| Self::transport_error(&e))?;
            let page: Vec<ListEntry> = Self::ensure_success(response)
                .await?
                .json()
                .await
                .map_err(|e| Self::transport_error(&e))?;

            let fetched = page.len();
            objects.extend(page.into_iter().filter(|e| e.id.is_some()).map(|e| {
                StoredObject {
                    path: if prefix.is_empty() {
                        e.name
                    } else {
                        format!("{prefix}/{}", e.name)
                    },
                    size: e.metadata.and_then(|m| m.size),
                }
            }));

            if fetched < self.page_size as usize {
                break;
            }
            offset += self.page_size;
        }

        debug!(bucket = %self.bucket, prefix = %prefix, count = objects.len(), "Listed artifacts");
        Ok(objects)
    }
}
