use std::sync::Arc;

use anyhow::Context;

use crate::auth::SessionTokens;
use crate::chat::ChatEngine;
use crate::core::config::{AppPaths, Settings};
use crate::history::SessionStore;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag;
use crate::search::TavilyClient;

/// Global application state shared across all routes.
///
/// Every external-service adapter is constructed exactly once here, from
/// explicit settings, and injected into the pipeline; nothing reaches for
/// implicit global clients.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub store: SessionStore,
    pub sessions: SessionTokens,
    pub engine: Arc<ChatEngine>,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths);

        let store = SessionStore::new(paths.db_path.clone())
            .await
            .context("Failed to open session store")?;

        let llm: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::new(
                &settings.openai_api_key,
                &settings.openai_base_url,
                &settings.chat_model,
                &settings.embed_model,
            )
            .context("Failed to build OpenAI client")?,
        );

        let index = rag::open_index(&settings, &paths)
            .await
            .context("Failed to open vector index")?;
        index
            .ensure_ready(settings.embed_dimension)
            .await
            .context("Failed to prepare vector index")?;
        tracing::info!("vector index ready ({})", index.name());

        let search = if settings.tavily_api_key.trim().is_empty() {
            tracing::info!("no Tavily API key configured; answering without web search");
            None
        } else {
            Some(TavilyClient::new(
                &settings.tavily_api_key,
                settings.search_max_results,
            ))
        };

        let engine = Arc::new(ChatEngine::new(
            llm,
            index,
            search,
            store.clone(),
            settings.clone(),
        ));

        Ok(Arc::new(AppState {
            paths,
            settings,
            store,
            sessions: SessionTokens::new(),
            engine,
        }))
    }
}
