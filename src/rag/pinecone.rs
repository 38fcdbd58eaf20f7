//! Pinecone serverless vector index adapter.
//!
//! Control plane (`api.pinecone.io`) handles describe/create; data-plane
//! requests go to the index host the control plane reports. Index creation
//! checks existence first instead of creating and catching the failure.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::store::{QueryMatch, VectorIndex, VectorRecord};
use crate::core::errors::ApiError;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

/// Pinecone caps upsert batches; larger ingests are split client-side.
const UPSERT_BATCH_LIMIT: usize = 100;

pub struct PineconeIndex {
    client: Client,
    index_name: String,
    cloud: String,
    region: String,
    /// Data-plane host, discovered by `ensure_ready`.
    host: RwLock<Option<String>>,
}

impl PineconeIndex {
    pub fn new(
        api_key: &str,
        index_name: &str,
        cloud: &str,
        region: &str,
    ) -> Result<Self, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::BadRequest("PINECONE_API_KEY is not set".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| ApiError::BadRequest("invalid Pinecone API key".to_string()))?,
        );
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            client,
            index_name: index_name.to_string(),
            cloud: cloud.to_string(),
            region: region.to_string(),
            host: RwLock::new(None),
        })
    }

    /// Returns the data-plane host if the index exists, `None` otherwise.
    async fn describe(&self) -> Result<Option<String>, ApiError> {
        let url = format!("{}/indexes/{}", CONTROL_PLANE_URL, self.index_name);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Pinecone describe-index failed ({}): {}",
                status, body
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let host = payload
            .get("host")
            .and_then(|v| v.as_str())
            .map(|h| h.to_string());
        Ok(host)
    }

    async fn create(&self, dimension: usize) -> Result<(), ApiError> {
        let url = format!("{}/indexes", CONTROL_PLANE_URL);
        let body = json!({
            "name": self.index_name,
            "dimension": dimension,
            "metric": "cosine",
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        // A concurrent creator winning the race still leaves the index
        // usable; conflict is treated as success.
        if res.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Pinecone create-index failed ({}): {}",
                status, text
            )));
        }

        Ok(())
    }

    async fn data_host(&self) -> Result<String, ApiError> {
        self.host
            .read()
            .await
            .clone()
            .ok_or_else(|| ApiError::Internal("vector index not initialized".to_string()))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn ensure_ready(&self, dimension: usize) -> Result<(), ApiError> {
        if let Some(host) = self.describe().await? {
            *self.host.write().await = Some(host);
            return Ok(());
        }

        tracing::info!("creating Pinecone index '{}'", self.index_name);
        self.create(dimension).await?;

        let host = self.describe().await?.ok_or_else(|| {
            ApiError::Upstream(format!(
                "Pinecone index '{}' not visible after creation",
                self.index_name
            ))
        })?;
        *self.host.write().await = Some(host);
        Ok(())
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), ApiError> {
        self.upsert_batch(vec![record]).await
    }

    async fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let host = self.data_host().await?;
        let url = format!("https://{}/vectors/upsert", host);

        for batch in records.chunks(UPSERT_BATCH_LIMIT) {
            let vectors: Vec<Value> = batch
                .iter()
                .map(|record| {
                    json!({
                        "id": record.id,
                        "values": record.values,
                        "metadata": { "text": record.text },
                    })
                })
                .collect();

            let res = self
                .client
                .post(&url)
                .json(&json!({ "vectors": vectors }))
                .send()
                .await
                .map_err(ApiError::upstream)?;

            if !res.status().is_success() {
                let status = res.status();
                let text = res.text().await.unwrap_or_default();
                return Err(ApiError::Upstream(format!(
                    "Pinecone upsert failed ({}): {}",
                    status, text
                )));
            }
        }

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, ApiError> {
        let host = self.data_host().await?;
        let url = format!("https://{}/query", host);

        let res = self
            .client
            .post(&url)
            .json(&json!({
                "vector": vector,
                "topK": top_k,
                "includeMetadata": true,
            }))
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Pinecone query failed ({}): {}",
                status, text
            )));
        }

        let payload: QueryResponse = res.json().await.map_err(ApiError::upstream)?;
        Ok(payload
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                text: m.metadata.map(|meta| meta.text).unwrap_or_default(),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let host = self.data_host().await?;
        let url = format!("https://{}/describe_index_stats", host);

        let res = self
            .client
            .post(&url)
            .json(&json!({}))
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Pinecone describe-index-stats failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let count = payload
            .get("totalVectorCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(count as usize)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryResponseMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryResponseMatch {
    id: String,
    score: f32,
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: String,
}
