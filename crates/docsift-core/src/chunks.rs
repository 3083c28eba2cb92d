//! Splits extracted page text into fixed-size word chunks for embedding.
//! Pages are chunked independently; a chunk never spans two pages.

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Split `text` into consecutive groups of at most `chunk_size` words.
///
/// Words are separated by any run of whitespace and re-joined with a single
/// space. Text with no words yields no chunks (never a single empty chunk).
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<Vec<String>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    Ok(words.chunks(chunk_size).map(|group| group.join(" ")).collect())
}

/// Chunk every page on its own, then concatenate the results in page order.
pub fn chunk_pages<S: AsRef<str>>(pages: &[S], chunk_size: usize) -> Result<Vec<String>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    let mut chunks = Vec::new();
    for page in pages {
        chunks.extend(chunk_text(page.as_ref(), chunk_size)?);
    }
    Ok(chunks)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk size must be at least one word")]
    ZeroChunkSize,
}
