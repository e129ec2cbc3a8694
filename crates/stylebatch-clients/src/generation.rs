//! Generation service client.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use stylebatch_config::GenerationConfig;
use stylebatch_core::{BatchError, BatchResult, GeneratedImage, GenerationRequest, Interface};
use tracing::{debug, warn};

const SERVICE: &str = "generation";

/// Produces one image per request.
#[async_trait]
pub trait GenerationService: Interface + Send + Sync {
    /// Generates the image for `request`.
    ///
    /// A non-success answer from the service is a
    /// [`BatchError::RemoteGeneration`]; transport failures are
    /// [`BatchError::Dependency`] or [`BatchError::Timeout`].
    async fn generate(&self, request: &GenerationRequest) -> BatchResult<GeneratedImage>;
}

/// HTTP client for the generation service.
///
/// Sends `POST {base_url}/v1/generate` with the JSON request and expects
/// the raw image bytes back, typed by the `Content-Type` header.
pub struct HttpGenerationClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpGenerationClient {
    /// Creates a client from configuration.
    pub fn new(config: &GenerationConfig) -> BatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BatchError::Configuration(format!("generation client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &GenerationConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    fn transport_error(err: &reqwest::Error) -> BatchError {
        if err.is_timeout() {
            BatchError::Timeout(format!("generation request: {err}"))
        } else {
            BatchError::dependency(SERVICE, err.to_string())
        }
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> BatchResult<GeneratedImage> {
        debug!(
            job_id = %request.job_id,
            work_item_id = %request.work_item_id,
            "Requesting generation"
        );

        let mut builder = self
            .client
            .post(format!("{}/v1/generate", self.base_url))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(
                work_item_id = %request.work_item_id,
                status = status.as_u16(),
                "Generation service rejected request"
            );
            return Err(BatchError::RemoteGeneration {
                status: status.as_u16(),
                detail,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        if bytes.is_empty() {
            return Err(BatchError::RemoteGeneration {
                status: status.as_u16(),
                detail: "empty image body".to_string(),
            });
        }

        Ok(GeneratedImage::new(bytes.to_vec(), content_type))
    }
}
