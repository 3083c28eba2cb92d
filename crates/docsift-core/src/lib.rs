//! All backend logic independent of how the service is exposed (HTTP or CLI).
//!
//! Uploaded PDFs are split into word chunks page by page, each chunk is
//! embedded by a remote provider, and queries are answered by a linear
//! cosine-similarity scan over everything held in memory (see [store]).

pub mod app_data;
pub mod chunks;
pub mod config;
pub mod embed;
pub mod pdf;
pub mod service;
pub mod similarity;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use app_data::app_config_dir;
pub use chunks::{chunk_pages, chunk_text, ChunkError, DEFAULT_CHUNK_SIZE};
pub use config::{default_config_path, load_config, save_config, Config, ConfigError, EmbeddingProvider};
pub use embed::{build_embedder, AzureOpenAiEmbedder, EmbedError, Embedder, OllamaEmbedder};
pub use pdf::{extract_pages, validate_upload, ExtractError, UploadError};
pub use service::{ErrorKind, IngestReport, SearchService, ServiceError, ServiceSettings};
pub use similarity::{cosine_similarity, SimilarityError};
pub use store::{DocumentStore, DocumentSummary, EmbeddedChunk, ScoredChunk, StoreError, DEFAULT_TOP_K};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "docsift-core ready"
}
