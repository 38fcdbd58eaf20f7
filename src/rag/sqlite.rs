//! SQLite-backed vector index.
//!
//! Local fallback when no managed index is configured: SQLite rows with
//! embedding BLOBs and brute-force cosine similarity at query time.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{QueryMatch, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        Ok(Self { pool })
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn ensure_ready(&self, dimension: usize) -> Result<(), ApiError> {
        self.init_schema().await?;

        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dimension'")
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        // A dimension change means a different embedding model; stored
        // vectors are no longer comparable and the index is rebuilt.
        if let Some(stored) = &stored {
            if stored.parse::<usize>().ok() != Some(dimension) {
                tracing::warn!(
                    "vector index dimension changed ({} -> {}); clearing stored vectors",
                    stored,
                    dimension
                );
                sqlx::query("DELETE FROM vectors")
                    .execute(&self.pool)
                    .await
                    .map_err(ApiError::internal)?;
            }
        }

        sqlx::query(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
             VALUES ('dimension', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(dimension.to_string())
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), ApiError> {
        let blob = Self::serialize_embedding(&record.values);

        sqlx::query("INSERT OR REPLACE INTO vectors (id, text, embedding) VALUES (?1, ?2, ?3)")
            .bind(&record.id)
            .bind(&record.text)
            .bind(&blob)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for record in &records {
            let blob = Self::serialize_embedding(&record.values);
            sqlx::query("INSERT OR REPLACE INTO vectors (id, text, embedding) VALUES (?1, ?2, ?3)")
                .bind(&record.id)
                .bind(&record.text)
                .bind(&blob)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ApiError> {
        let rows = sqlx::query("SELECT id, text, embedding FROM vectors")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let mut scored: Vec<QueryMatch> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                Some(QueryMatch {
                    id: row.get("id"),
                    score: Self::cosine_similarity(vector, &stored),
                    text: row.get("text"),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k.max(1));

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> SqliteVectorIndex {
        let tmp = std::env::temp_dir().join(format!("chronicle-vec-test-{}.db", uuid::Uuid::new_v4()));
        let index = SqliteVectorIndex::with_path(tmp).await.unwrap();
        index.ensure_ready(3).await.unwrap();
        index
    }

    fn record(id: &str, values: Vec<f32>, text: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_and_query() {
        let index = test_index().await;

        index
            .upsert(record("chunk-0", vec![1.0, 0.0, 0.0], "hello world"))
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let matches = index.query(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "chunk-0");
        assert_eq!(matches[0].text, "hello world");
        assert!(matches[0].score > 0.99);
    }

    #[tokio::test]
    async fn reupsert_replaces_wholesale() {
        let index = test_index().await;

        index
            .upsert(record("chunk-0", vec![1.0, 0.0, 0.0], "first text"))
            .await
            .unwrap();
        index
            .upsert(record("chunk-0", vec![0.0, 1.0, 0.0], "second text"))
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 1);

        let matches = index.query(&[0.0, 1.0, 0.0], 1).await.unwrap();
        assert_eq!(matches[0].text, "second text");
        assert!(matches[0].score > 0.99);

        // The old vector is gone, not just shadowed.
        let matches = index.query(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert!(matches[0].score < 0.01);
    }

    #[tokio::test]
    async fn query_scores_are_non_increasing() {
        let index = test_index().await;

        index
            .upsert_batch(vec![
                record("chunk-0", vec![1.0, 0.0, 0.0], "closest"),
                record("chunk-1", vec![0.7, 0.7, 0.0], "middle"),
                record("chunk-2", vec![0.0, 0.0, 1.0], "farthest"),
            ])
            .await
            .unwrap();

        let matches = index.query(&[1.0, 0.0, 0.0], 3).await.unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].text, "closest");
        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn top_k_truncates() {
        let index = test_index().await;

        index
            .upsert_batch(vec![
                record("chunk-0", vec![1.0, 0.0, 0.0], "a"),
                record("chunk-1", vec![0.9, 0.1, 0.0], "b"),
                record("chunk-2", vec![0.8, 0.2, 0.0], "c"),
            ])
            .await
            .unwrap();

        let matches = index.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn ensure_ready_is_idempotent_but_clears_on_dimension_change() {
        let index = test_index().await;

        index
            .upsert(record("chunk-0", vec![1.0, 0.0, 0.0], "kept"))
            .await
            .unwrap();

        index.ensure_ready(3).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        index.ensure_ready(4).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
