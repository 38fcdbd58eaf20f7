//! VectorIndex trait — abstract interface for vector index backends.
//!
//! The write path upserts (id, vector, text) records; the read path runs
//! top-k nearest-neighbor queries. Backends: `PineconeIndex` (remote managed
//! index) and `SqliteVectorIndex` (local brute-force fallback).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// An embedded chunk as stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Stable key, unique within one ingestion run (`chunk-{index}`).
    pub id: String,
    /// Embedding vector; length equals the configured index dimension.
    pub values: Vec<f32>,
    /// The chunk text, carried as metadata so queries can return it.
    pub text: String,
}

/// A single nearest-neighbor query hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    /// Similarity score (higher = closer).
    pub score: f32,
    pub text: String,
}

/// Abstract trait for vector index backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name, for startup logging.
    fn name(&self) -> &str;

    /// Idempotent index setup. Existence is checked before creation; an
    /// index that already exists is opened as-is.
    async fn ensure_ready(&self, dimension: usize) -> Result<(), ApiError>;

    /// Insert or replace a single record. Re-upsert by id replaces the
    /// stored vector and text wholesale.
    async fn upsert(&self, record: VectorRecord) -> Result<(), ApiError>;

    /// Insert or replace multiple records.
    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), ApiError>;

    /// Top-k nearest neighbors, sorted by descending similarity score.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ApiError>;

    /// Total stored vector count.
    async fn count(&self) -> Result<usize, ApiError>;
}
