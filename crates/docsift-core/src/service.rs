//! Ingest and query pipeline: extract → chunk → embed → store, and
//! embed → rank. One [`SearchService`] is built per process and shared.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::chunks::{chunk_pages, ChunkError, DEFAULT_CHUNK_SIZE};
use crate::config::{Config, ConfigError};
use crate::embed::{build_embedder, EmbedError, Embedder};
use crate::pdf::{self, ExtractError, UploadError};
use crate::store::{DocumentStore, EmbeddedChunk, ScoredChunk, StoreError, DEFAULT_TOP_K};

/// Tunables for a [`SearchService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub chunk_size: usize,
    pub top_k: usize,
    pub embed_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            embed_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            top_k: config.top_k,
            embed_timeout: config.embed_timeout(),
        }
    }
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
}

pub struct SearchService {
    embedder: Arc<dyn Embedder>,
    store: DocumentStore,
    settings: ServiceSettings,
}

impl SearchService {
    pub fn new(embedder: Arc<dyn Embedder>, settings: ServiceSettings) -> Self {
        Self {
            embedder,
            store: DocumentStore::new(),
            settings,
        }
    }

    /// Validate `config` and build the service with the embedder it names.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let embedder = build_embedder(&config.embedding, config.embed_timeout())?;
        info!(provider = embedder.name(), chunk_size = config.chunk_size, top_k = config.top_k, "search service ready");
        Ok(Self::new(embedder, ServiceSettings::from(config)))
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Validate an uploaded file, then ingest it under its filename.
    pub async fn ingest_upload(
        &self,
        filename: Option<&str>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<IngestReport, ServiceError> {
        let document_id = pdf::validate_upload(filename, content_type, &bytes)?;
        self.ingest_pdf(&document_id, bytes).await
    }

    /// Extract a PDF's pages and ingest them. Nothing is stored on failure.
    pub async fn ingest_pdf(&self, document_id: &str, bytes: Vec<u8>) -> Result<IngestReport, ServiceError> {
        let pages = tokio::task::spawn_blocking(move || pdf::extract_pages(&bytes))
            .await
            .map_err(|e| ServiceError::Internal(format!("extraction task failed: {e}")))?
            .map_err(|e| {
                error!(document = document_id, error = %e, "extraction failed");
                e
            })?;
        debug!(document = document_id, pages = pages.len(), "extracted pages");
        self.ingest_pages(document_id, &pages).await
    }

    /// Chunk each page, embed every chunk, and replace the document's entry.
    ///
    /// Embedding calls run one at a time; the first failure aborts the
    /// ingest and leaves any previous version of the document in place.
    pub async fn ingest_pages<S: AsRef<str>>(
        &self,
        document_id: &str,
        pages: &[S],
    ) -> Result<IngestReport, ServiceError> {
        let texts = chunk_pages(pages, self.settings.chunk_size)?;
        let mut chunks = Vec::with_capacity(texts.len());
        for (index, text) in texts.into_iter().enumerate() {
            let embedding = self.embed_bounded(&text).await.map_err(|e| {
                error!(document = document_id, chunk = index, error = %e, "embedding failed during ingest");
                e
            })?;
            chunks.push(EmbeddedChunk::new(text, embedding));
        }

        let chunk_count = chunks.len();
        self.store.put(document_id, chunks).await?;
        info!(document = document_id, pages = pages.len(), chunk_count, "ingested document");
        Ok(IngestReport {
            document_id: document_id.to_string(),
            chunk_count,
        })
    }

    /// Rank stored chunks against `text`. `k` defaults to the configured top-k.
    pub async fn query(&self, text: &str, k: Option<usize>) -> Result<Vec<ScoredChunk>, ServiceError> {
        // Blank check only; the text is embedded as given.
        if text.trim().is_empty() {
            return Err(ServiceError::EmptyQuery);
        }
        if self.store.chunk_count().await == 0 {
            return Err(ServiceError::NoData);
        }
        let k = k.unwrap_or(self.settings.top_k);
        let embedding = self.embed_bounded(text).await?;
        let results = self.store.query(&embedding, k).await?;
        debug!(query_len = text.len(), k, hits = results.len(), "query ranked");
        Ok(results)
    }

    async fn embed_bounded(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let timeout = self.settings.embed_timeout;
        match tokio::time::timeout(timeout, self.embedder.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(EmbedError::Timeout(timeout)),
        }
    }
}

/// Broad failure category, for callers that map errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input from the caller; nothing was changed.
    Client,
    /// The document could not be read.
    Extraction,
    /// The embedding service failed or returned garbage.
    Upstream,
    /// The embedding service did not answer in time.
    Timeout,
    /// Query against a store with nothing in it.
    NoData,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("query text must not be empty")]
    EmptyQuery,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error("no PDFs processed yet")]
    NoData,
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Empty => ServiceError::NoData,
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::EmptyQuery | ServiceError::Upload(_) => ErrorKind::Client,
            ServiceError::Extract(_) => ErrorKind::Extraction,
            ServiceError::Embed(EmbedError::Timeout(_)) => ErrorKind::Timeout,
            ServiceError::Embed(_) => ErrorKind::Upstream,
            ServiceError::NoData => ErrorKind::NoData,
            ServiceError::Chunk(_)
            | ServiceError::Store(_)
            | ServiceError::Config(_)
            | ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }
}
