//! Embedding providers. The rest of the crate only sees the [`Embedder`] port,
//! so chunking and ranking can be exercised without a network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::Ollama;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::config::{EmbeddingConfig, EmbeddingProvider};

pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// A single-method port: text in, one fixed-length vector out.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Short provider name, used in logs.
    fn name(&self) -> &str;
}

/// Build the embedder described by `config`. `timeout` bounds each HTTP request.
pub fn build_embedder(
    config: &EmbeddingConfig,
    timeout: Duration,
) -> Result<Arc<dyn Embedder>, EmbedError> {
    match config.provider {
        EmbeddingProvider::Azure => {
            let endpoint = config.endpoint.as_deref().ok_or(EmbedError::MissingEndpoint)?;
            let api_key = config.api_key.clone().ok_or(EmbedError::MissingApiKey)?;
            let embedder = AzureOpenAiEmbedder::new(
                endpoint,
                &config.deployment,
                &config.api_version,
                api_key,
                timeout,
            )?;
            Ok(Arc::new(embedder))
        }
        EmbeddingProvider::Ollama => {
            let url = config.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaEmbedder::from_url(url)?.with_model(&config.model)))
        }
    }
}

// ── Azure OpenAI ───────────────────────────────────────────────────

/// Calls an Azure OpenAI embeddings deployment over REST.
#[derive(Debug, Clone)]
pub struct AzureOpenAiEmbedder {
    client: reqwest::Client,
    url: Url,
    api_key: String,
    timeout: Duration,
}

impl AzureOpenAiEmbedder {
    /// `endpoint` is the resource root, e.g. `https://my-resource.openai.azure.com/`.
    pub fn new(
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(EmbedError::MissingApiKey);
        }
        let root = endpoint.trim_end_matches('/');
        let mut url = Url::parse(&format!("{root}/openai/deployments/{deployment}/embeddings"))
            .map_err(EmbedError::InvalidUrl)?;
        url.query_pairs_mut().append_pair("api-version", api_version);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EmbedError::Network)?;
        Ok(Self {
            client,
            url,
            api_key,
            timeout,
        })
    }

    /// Full request URL, including the api-version query.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for AzureOpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        debug!(provider = "azure-openai", text_len = text.len(), "embedding text");

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { input: text })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "azure-openai", error = %e, "request failed");
                if e.is_timeout() {
                    EmbedError::Timeout(self.timeout)
                } else {
                    EmbedError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = "azure-openai", %status, "embedding API error");
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(EmbedError::Network)?;
        let parsed: EmbeddingResponse = serde_json::from_slice(&body)
            .map_err(|e| EmbedError::Malformed(format!("unexpected response body: {e}")))?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::Malformed("response has no data entries".into()))?;
        if embedding.is_empty() {
            return Err(EmbedError::Malformed("response embedding is empty".into()));
        }
        Ok(embedding)
    }

    fn name(&self) -> &str {
        "azure-openai"
    }
}

// ── Ollama ─────────────────────────────────────────────────────────

/// Local alternative to Azure, backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    inner: Ollama,
    model: String,
}

impl OllamaEmbedder {
    /// Create from URL string. Default: http://localhost:11434.
    pub fn from_url(url: &str) -> Result<Self, EmbedError> {
        let inner = Ollama::try_new(url).map_err(EmbedError::InvalidUrl)?;
        Ok(Self {
            inner,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        })
    }

    /// Set the embedding model (e.g. `nomic-embed-text`, `all-minilm`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        debug!(provider = "ollama", model = %self.model, text_len = text.len(), "embedding text");
        let req = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );
        let res = self.inner.generate_embeddings(req).await.map_err(|e| {
            error!(provider = "ollama", error = %e, "request failed");
            EmbedError::Ollama(e)
        })?;
        match res.embeddings.into_iter().next() {
            Some(embedding) if !embedding.is_empty() => Ok(embedding),
            _ => Err(EmbedError::Malformed("Ollama returned no embedding".into())),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding endpoint is not configured")]
    MissingEndpoint,
    #[error("embedding API key is not configured")]
    MissingApiKey,
    #[error("invalid embedding endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("embedding request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Ollama request failed: {0}")]
    Ollama(#[from] ollama_rs::error::OllamaError),
}
