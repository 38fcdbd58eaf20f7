//! Tavily web search client.
//!
//! Optional read-side supplement: when a key is configured, each question is
//! also sent to Tavily and the snippet contents are blended into the prompt.

use serde::Serialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

const SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Clone, Serialize)]
pub struct SearchSnippet {
    pub title: String,
    pub url: String,
    pub content: String,
}

#[derive(Clone)]
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    max_results: usize,
}

impl TavilyClient {
    pub fn new(api_key: &str, max_results: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.trim().to_string(),
            max_results: max_results.max(1),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>, ApiError> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": "basic",
            "max_results": self.max_results,
        });

        let res = self
            .client
            .post(SEARCH_URL)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Tavily search failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let mut snippets = Vec::new();

        if let Some(items) = payload.get("results").and_then(|v| v.as_array()) {
            for item in items {
                let content = item.get("content").and_then(|v| v.as_str()).unwrap_or("");
                if content.is_empty() {
                    continue;
                }
                snippets.push(SearchSnippet {
                    title: item
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    url: item
                        .get("url")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    content: content.to_string(),
                });
            }
        }

        Ok(snippets)
    }
}
