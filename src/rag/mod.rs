//! Retrieval: chunking, vector index backends, and prompt context assembly.

use std::sync::Arc;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::ApiError;

pub mod chunker;
pub mod context_builder;
pub mod pinecone;
pub mod sqlite;
pub mod store;

pub use chunker::{chunk_words, Chunk};
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteVectorIndex;
pub use store::{QueryMatch, VectorIndex, VectorRecord};

/// Open the configured vector index backend: Pinecone when an API key is
/// present, the local SQLite index otherwise.
pub async fn open_index(
    settings: &Settings,
    paths: &AppPaths,
) -> Result<Arc<dyn VectorIndex>, ApiError> {
    if settings.pinecone_api_key.trim().is_empty() {
        tracing::info!("no Pinecone API key configured; using local vector index");
        let index = SqliteVectorIndex::with_path(paths.vector_db_path.clone()).await?;
        Ok(Arc::new(index))
    } else {
        let index = PineconeIndex::new(
            &settings.pinecone_api_key,
            &settings.index_name,
            &settings.index_cloud,
            &settings.index_region,
        )?;
        Ok(Arc::new(index))
    }
}
