//! VectorStore trait — abstract interface for the semantic index.
//!
//! One logical collection holds the embedded chunks of the most recent
//! ingestion. The primary implementation is `SqliteVectorStore` in the
//! `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::rag::chunker::Chunk;

/// An embedded chunk as written to the index. Exactly one record exists
/// per chunk; records live until the collection is cleared or rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_id: String,
    pub content: String,
    /// Source label (original filename).
    pub source: String,
    /// 1-based page number for paginated sources.
    pub page: Option<u32>,
    /// Zero-based sequence index within the source document.
    pub seq: usize,
    /// Character offset of the chunk start in the source document.
    pub start_offset: usize,
    pub embedding: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn from_chunk(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.id,
            content: chunk.text,
            source: chunk.source,
            page: chunk.page,
            seq: chunk.seq,
            start_offset: chunk.start_offset,
            embedding,
        }
    }
}

/// A retrieved passage, embedding omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPassage {
    pub chunk_id: String,
    pub content: String,
    pub source: String,
    pub page: Option<u32>,
}

/// One entry of a retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageMatch {
    pub passage: StoredPassage,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Abstract interface for the vector index backing one or more named
/// collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert records, replacing any existing record with the same chunk id.
    async fn upsert(&self, collection: &str, records: Vec<EmbeddingRecord>)
        -> Result<(), ApiError>;

    /// Atomically swap the collection contents for a fresh record set.
    /// Concurrent readers observe either the old or the new generation.
    async fn replace(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), ApiError>;

    /// Return the `k` records most similar to `embedding`, descending by
    /// cosine similarity, ties broken by insertion order. `k == 0` is
    /// rejected; an empty collection yields an empty result.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<PassageMatch>, ApiError>;

    /// Remove every record of the collection, returning the removed count.
    async fn clear(&self, collection: &str) -> Result<usize, ApiError>;

    /// Number of records currently in the collection.
    async fn count(&self, collection: &str) -> Result<usize, ApiError>;
}
