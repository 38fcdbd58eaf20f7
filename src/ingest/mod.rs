//! Corpus ingestion: PDF text -> word chunks -> embeddings -> vector index.

use std::path::Path;
use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::{chunk_words, VectorIndex, VectorRecord};

pub mod pdf;

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub chunks: usize,
}

pub struct Ingestor {
    llm: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    max_words: usize,
    dimension: usize,
}

impl Ingestor {
    pub fn new(llm: Arc<dyn LlmProvider>, index: Arc<dyn VectorIndex>, settings: &Settings) -> Self {
        Self {
            llm,
            index,
            max_words: settings.chunk_max_words,
            dimension: settings.embed_dimension,
        }
    }

    pub async fn ingest_pdf(&self, path: &Path) -> Result<IngestReport, ApiError> {
        let text = pdf::extract_text(path)?;
        self.ingest_text(&text).await
    }

    /// Chunk, embed and upsert one document. Chunk ids (`chunk-{index}`) are
    /// stable across runs, so re-ingesting replaces the previous corpus
    /// entry for each position.
    pub async fn ingest_text(&self, text: &str) -> Result<IngestReport, ApiError> {
        let chunks = chunk_words(text, self.max_words);
        if chunks.is_empty() {
            return Err(ApiError::BadRequest("document contains no words".to_string()));
        }
        let total = chunks.len();
        tracing::info!("chunked document into {} windows of {} words", total, self.max_words);

        self.index.ensure_ready(self.dimension).await?;

        // One embedding call per chunk; the gateway does no batching.
        let mut records = Vec::with_capacity(total);
        for chunk in &chunks {
            let vectors = self.llm.embed(std::slice::from_ref(&chunk.text)).await?;
            let values = vectors.into_iter().next().ok_or_else(|| {
                ApiError::Upstream("embedding service returned no vector".to_string())
            })?;
            if values.len() != self.dimension {
                return Err(ApiError::Upstream(format!(
                    "embedding has {} dimensions, index expects {}",
                    values.len(),
                    self.dimension
                )));
            }

            records.push(VectorRecord {
                id: format!("chunk-{}", chunk.index),
                values,
                text: chunk.text.clone(),
            });

            if records.len() % 10 == 0 {
                tracing::info!("embedded {}/{} chunks", records.len(), total);
            }
        }

        self.index.upsert_batch(records).await?;
        tracing::info!("stored {} chunks in the {} index", total, self.index.name());

        Ok(IngestReport { chunks: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::llm::ChatRequest;
    use crate::rag::SqliteVectorIndex;

    /// Embeds each input as a deterministic function of its word count.
    struct CountingProvider;

    #[async_trait]
    impl LlmProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<String, ApiError> {
            Ok(String::new())
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs
                .iter()
                .map(|input| {
                    let words = input.split_whitespace().count() as f32;
                    vec![words, 1.0, 0.0]
                })
                .collect())
        }
    }

    async fn test_ingestor(max_words: usize) -> (Ingestor, Arc<SqliteVectorIndex>) {
        let settings = Settings {
            chunk_max_words: max_words,
            embed_dimension: 3,
            ..Settings::default()
        };

        let tmp = std::env::temp_dir().join(format!(
            "chronicle-ingest-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let index = Arc::new(SqliteVectorIndex::with_path(tmp).await.unwrap());

        let ingestor = Ingestor::new(Arc::new(CountingProvider), index.clone(), &settings);
        (ingestor, index)
    }

    #[tokio::test]
    async fn ingest_text_stores_one_record_per_chunk() {
        let (ingestor, index) = test_ingestor(2).await;

        let report = ingestor.ingest_text("a b c d e").await.unwrap();
        assert_eq!(report.chunks, 3);
        assert_eq!(index.count().await.unwrap(), 3);

        // Full windows embed identically; the short tail does not.
        let matches = index.query(&[2.0, 1.0, 0.0], 3).await.unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[2].text, "e");
    }

    #[tokio::test]
    async fn reingesting_replaces_by_chunk_id() {
        let (ingestor, index) = test_ingestor(2).await;

        ingestor.ingest_text("a b c d").await.unwrap();
        ingestor.ingest_text("x y z w").await.unwrap();

        assert_eq!(index.count().await.unwrap(), 2);
        let matches = index.query(&[2.0, 1.0, 0.0], 10).await.unwrap();
        assert!(matches.iter().all(|m| ["x y", "z w"].contains(&m.text.as_str())));
    }

    #[tokio::test]
    async fn empty_document_is_an_error() {
        let (ingestor, _index) = test_ingestor(100).await;
        let result = ingestor.ingest_text("   \n ").await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
