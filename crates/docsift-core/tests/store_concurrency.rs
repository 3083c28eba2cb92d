//! Concurrent writers and readers against one DocumentStore.

use std::sync::Arc;

use docsift_core::{DocumentStore, EmbeddedChunk};

const CHUNKS_PER_VERSION: usize = 8;

fn version(tag: usize) -> Vec<EmbeddedChunk> {
    (0..CHUNKS_PER_VERSION)
        .map(|i| EmbeddedChunk::new(format!("v{tag}-{i}"), vec![1.0, i as f32]))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_mixed_document() {
    let store = Arc::new(DocumentStore::new());
    store.put("shared.pdf", version(0)).await.unwrap();

    let writers: Vec<_> = (1..=4)
        .map(|w| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for round in 0..50 {
                    store.put("shared.pdf", version(w * 1000 + round)).await.unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..100 {
                    let hits = store.query(&[1.0, 0.5], CHUNKS_PER_VERSION).await.unwrap();
                    assert_eq!(hits.len(), CHUNKS_PER_VERSION);
                    let tags: Vec<&str> = hits
                        .iter()
                        .map(|h| h.text.split('-').next().unwrap())
                        .collect();
                    assert!(
                        tags.windows(2).all(|w| w[0] == w[1]),
                        "mixed versions observed: {tags:?}"
                    );
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.await.unwrap();
    }
    assert_eq!(store.len().await, 1);
    assert_eq!(store.chunk_count().await, CHUNKS_PER_VERSION);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_to_distinct_documents_all_land() {
    let store = Arc::new(DocumentStore::new());
    let handles: Vec<_> = (0..16)
        .map(|d| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.put(format!("doc-{d}.pdf"), version(d)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(store.len().await, 16);
    assert_eq!(store.chunk_count().await, 16 * CHUNKS_PER_VERSION);
}
