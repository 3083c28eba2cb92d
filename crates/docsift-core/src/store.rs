//! In-memory document store: document id → embedded chunks, searched by a
//! linear cosine-similarity scan over every chunk of every document.
//! No persistence; the store is discarded when the process exits.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::similarity::{cosine_similarity, SimilarityError};

/// Default number of results returned by a query.
pub const DEFAULT_TOP_K: usize = 3;

/// A chunk of document text with its embedding. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    text: String,
    embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// One ranked query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Identifier of the document the chunk came from.
    pub document: String,
    pub text: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// A stored document and how many chunks it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document: String,
    pub chunks: usize,
}

#[derive(Debug)]
struct StoredDocument {
    /// Position in insertion order; kept when the document is replaced.
    seq: u64,
    chunks: Arc<[EmbeddedChunk]>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, StoredDocument>,
    next_seq: u64,
    /// Dimension shared by every stored embedding, once one exists.
    dimension: Option<usize>,
}

impl Inner {
    fn chunk_count(&self) -> usize {
        self.documents.values().map(|d| d.chunks.len()).sum()
    }
}

/// Process-wide mapping from document id to its embedded chunks.
///
/// A document's chunk sequence is swapped in as a whole, so readers see
/// either the old sequence or the new one. Queries score a snapshot taken
/// under a short read lock and never hold the lock while ranking.
#[derive(Debug, Default)]
pub struct DocumentStore {
    inner: RwLock<Inner>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is stored under `document_id` with `chunks`.
    ///
    /// Every embedding must be finite and share the store's dimension; if
    /// any does not, nothing is changed.
    pub async fn put(
        &self,
        document_id: impl Into<String>,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<(), StoreError> {
        let document_id = document_id.into();
        let incoming = uniform_dimension(&chunks)?;
        let chunks: Arc<[EmbeddedChunk]> = chunks.into();

        let mut guard = self.inner.write().await;
        let Inner {
            documents,
            next_seq,
            dimension,
        } = &mut *guard;

        if let (Some(expected), Some(actual)) = (*dimension, incoming) {
            if expected != actual {
                return Err(SimilarityError::DimensionMismatch { expected, actual }.into());
            }
        }
        match documents.entry(document_id) {
            Entry::Occupied(mut slot) => slot.get_mut().chunks = chunks,
            Entry::Vacant(slot) => {
                slot.insert(StoredDocument {
                    seq: *next_seq,
                    chunks,
                });
                *next_seq += 1;
            }
        }
        if incoming.is_some() {
            *dimension = incoming;
        } else if documents.values().all(|d| d.chunks.is_empty()) {
            *dimension = None;
        }
        Ok(())
    }

    /// The `k` chunks most similar to `query` across all documents,
    /// best first. Equal scores keep insertion order.
    pub async fn query(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        if query.iter().any(|x| !x.is_finite()) {
            return Err(StoreError::NonFinite);
        }
        let (snapshot, dimension) = self.snapshot().await;
        if snapshot.iter().all(|(_, chunks)| chunks.is_empty()) {
            return Err(StoreError::Empty);
        }
        if let Some(expected) = dimension {
            if expected != query.len() {
                return Err(SimilarityError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                }
                .into());
            }
        }

        let mut scored = Vec::new();
        for (document, chunks) in &snapshot {
            for chunk in chunks.iter() {
                let score = cosine_similarity(chunk.embedding(), query)?;
                scored.push((document, chunk, score));
            }
        }
        // stable: ties (including -0.0 vs 0.0) stay in insertion order.
        // Scores are never NaN, since non-finite vectors are rejected above.
        scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(document, chunk, score)| ScoredChunk {
                document: document.clone(),
                text: chunk.text().to_string(),
                score,
            })
            .collect())
    }

    /// Remove a document. Returns whether it was present.
    pub async fn remove(&self, document_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.documents.remove(document_id).is_some();
        if inner.chunk_count() == 0 {
            inner.dimension = None;
        }
        removed
    }

    /// Stored documents in insertion order.
    pub async fn documents(&self) -> Vec<DocumentSummary> {
        let (snapshot, _) = self.snapshot().await;
        snapshot
            .into_iter()
            .map(|(document, chunks)| DocumentSummary {
                document,
                chunks: chunks.len(),
            })
            .collect()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.documents.is_empty()
    }

    /// Number of chunks across all documents.
    pub async fn chunk_count(&self) -> usize {
        self.inner.read().await.chunk_count()
    }

    /// Embedding dimension of the stored chunks, if any are stored.
    pub async fn dimension(&self) -> Option<usize> {
        self.inner.read().await.dimension
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.documents.clear();
        inner.dimension = None;
    }

    async fn snapshot(&self) -> (Vec<(String, Arc<[EmbeddedChunk]>)>, Option<usize>) {
        let inner = self.inner.read().await;
        let mut entries: Vec<(u64, String, Arc<[EmbeddedChunk]>)> = inner
            .documents
            .iter()
            .map(|(id, doc)| (doc.seq, id.clone(), Arc::clone(&doc.chunks)))
            .collect();
        let dimension = inner.dimension;
        drop(inner);
        entries.sort_by_key(|(seq, _, _)| *seq);
        (
            entries.into_iter().map(|(_, id, chunks)| (id, chunks)).collect(),
            dimension,
        )
    }
}

/// The dimension all `chunks` share, or `None` for an empty slice.
fn uniform_dimension(chunks: &[EmbeddedChunk]) -> Result<Option<usize>, StoreError> {
    let mut dimension = None;
    for chunk in chunks {
        let embedding = chunk.embedding();
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(StoreError::NonFinite);
        }
        match dimension {
            None => dimension = Some(embedding.len()),
            Some(expected) if expected != embedding.len() => {
                return Err(SimilarityError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                }
                .into());
            }
            Some(_) => {}
        }
    }
    Ok(dimension)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no documents have been ingested yet")]
    Empty,
    #[error("embedding contains NaN or infinite values")]
    NonFinite,
    #[error(transparent)]
    Similarity(#[from] SimilarityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: &[f32]) -> EmbeddedChunk {
        EmbeddedChunk::new(text, embedding.to_vec())
    }

    fn texts(results: &[ScoredChunk]) -> Vec<&str> {
        results.iter().map(|r| r.text.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_store_reports_empty() {
        let store = DocumentStore::new();
        assert_eq!(store.query(&[1.0, 0.0], 3).await, Err(StoreError::Empty));
    }

    #[tokio::test]
    async fn document_with_no_chunks_is_still_empty() {
        let store = DocumentStore::new();
        store.put("blank.pdf", Vec::new()).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.query(&[1.0], 3).await, Err(StoreError::Empty));
    }

    #[tokio::test]
    async fn ranks_across_documents() {
        let store = DocumentStore::new();
        store
            .put("a.pdf", vec![chunk("a0", &[1.0, 0.0]), chunk("a1", &[0.0, 1.0])])
            .await
            .unwrap();
        store
            .put("b.pdf", vec![chunk("b0", &[0.7, 0.7])])
            .await
            .unwrap();

        let results = store.query(&[0.0, 1.0], 2).await.unwrap();
        assert_eq!(texts(&results), vec!["a1", "b0"]);
        assert_eq!(results[0].document, "a.pdf");
        assert_eq!(results[1].document, "b.pdf");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn returns_at_most_k() {
        let store = DocumentStore::new();
        store
            .put("a.pdf", vec![chunk("x", &[1.0]), chunk("y", &[2.0])])
            .await
            .unwrap();
        assert_eq!(store.query(&[1.0], 5).await.unwrap().len(), 2);
        assert_eq!(store.query(&[1.0], 1).await.unwrap().len(), 1);
        assert!(store.query(&[1.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = DocumentStore::new();
        store
            .put("first.pdf", vec![chunk("f0", &[1.0, 1.0]), chunk("f1", &[2.0, 2.0])])
            .await
            .unwrap();
        store
            .put("second.pdf", vec![chunk("s0", &[3.0, 3.0])])
            .await
            .unwrap();

        for _ in 0..5 {
            let results = store.query(&[1.0, 1.0], 3).await.unwrap();
            assert_eq!(texts(&results), vec!["f0", "f1", "s0"]);
        }
    }

    #[tokio::test]
    async fn signed_zero_scores_tie_in_insertion_order() {
        let store = DocumentStore::new();
        store
            .put("first.pdf", vec![chunk("f", &[1e-30, 0.0, 1.0])])
            .await
            .unwrap();
        store
            .put("second.pdf", vec![chunk("s", &[0.0, 0.0, 1.0])])
            .await
            .unwrap();

        let results = store.query(&[-1e-30, 1.0, 0.0], 2).await.unwrap();
        assert_eq!(texts(&results), vec!["f", "s"]);
        assert_eq!(results[0].score, 0.0);
        assert_eq!(results[1].score, 0.0);
    }

    #[tokio::test]
    async fn emptied_store_accepts_new_dimension() {
        let store = DocumentStore::new();
        store.put("a.pdf", vec![chunk("x", &[1.0, 0.0])]).await.unwrap();
        store.put("a.pdf", Vec::new()).await.unwrap();
        assert_eq!(store.chunk_count().await, 0);
        assert_eq!(store.dimension().await, None);

        store
            .put("b.pdf", vec![chunk("y", &[0.0, 0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.dimension().await, Some(3));
        let results = store.query(&[0.0, 0.0, 1.0], 3).await.unwrap();
        assert_eq!(texts(&results), vec!["y"]);
    }

    #[tokio::test]
    async fn replacement_keeps_position_and_drops_old_chunks() {
        let store = DocumentStore::new();
        store.put("a.pdf", vec![chunk("old", &[1.0, 0.0])]).await.unwrap();
        store.put("b.pdf", vec![chunk("b", &[1.0, 0.0])]).await.unwrap();
        store.put("a.pdf", vec![chunk("new", &[1.0, 0.0])]).await.unwrap();

        let results = store.query(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(texts(&results), vec!["new", "b"]);
        let docs: Vec<String> = store.documents().await.into_iter().map(|d| d.document).collect();
        assert_eq!(docs, vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn zero_norm_chunk_scores_zero() {
        let store = DocumentStore::new();
        store
            .put("a.pdf", vec![chunk("zero", &[0.0, 0.0]), chunk("neg", &[-1.0, 0.0])])
            .await
            .unwrap();
        let results = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(texts(&results), vec!["zero", "neg"]);
        assert_eq!(results[0].score, 0.0);
    }

    #[tokio::test]
    async fn query_dimension_mismatch_fails() {
        let store = DocumentStore::new();
        store.put("a.pdf", vec![chunk("x", &[1.0, 0.0])]).await.unwrap();
        assert_eq!(
            store.query(&[1.0, 0.0, 0.0], 3).await,
            Err(StoreError::Similarity(SimilarityError::DimensionMismatch {
                expected: 2,
                actual: 3
            }))
        );
    }

    #[tokio::test]
    async fn put_rejects_mixed_dimensions_and_keeps_old_entry() {
        let store = DocumentStore::new();
        store.put("a.pdf", vec![chunk("keep", &[1.0, 0.0])]).await.unwrap();

        let mixed = vec![chunk("x", &[1.0, 0.0]), chunk("y", &[1.0])];
        assert!(store.put("a.pdf", mixed).await.is_err());

        let other_dim = vec![chunk("z", &[1.0, 0.0, 0.0])];
        assert!(store.put("b.pdf", other_dim).await.is_err());

        let results = store.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(texts(&results), vec!["keep"]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn rejects_non_finite_values() {
        let store = DocumentStore::new();
        let bad = vec![chunk("nan", &[f32::NAN, 1.0])];
        assert_eq!(store.put("a.pdf", bad).await, Err(StoreError::NonFinite));
        store.put("a.pdf", vec![chunk("ok", &[1.0, 1.0])]).await.unwrap();
        assert_eq!(
            store.query(&[f32::INFINITY, 1.0], 1).await,
            Err(StoreError::NonFinite)
        );
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let store = DocumentStore::new();
        store.put("a.pdf", vec![chunk("x", &[1.0])]).await.unwrap();
        store.put("b.pdf", vec![chunk("y", &[1.0]), chunk("z", &[1.0])]).await.unwrap();
        assert_eq!(store.chunk_count().await, 3);

        assert!(store.remove("a.pdf").await);
        assert!(!store.remove("a.pdf").await);
        assert_eq!(store.chunk_count().await, 2);
        assert_eq!(store.dimension().await, Some(1));

        store.clear().await;
        assert!(store.is_empty().await);
        assert_eq!(store.dimension().await, None);
    }
}
