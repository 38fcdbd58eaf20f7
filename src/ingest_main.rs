use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use chronicle::core::config::{AppPaths, Settings};
use chronicle::ingest::Ingestor;
use chronicle::llm::{LlmProvider, OpenAiProvider};
use chronicle::logging;
use chronicle::rag;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let args: Vec<String> = env::args().collect();
    let Some(pdf_path) = args.get(1) else {
        eprintln!("usage: ingest <pdf-path>");
        std::process::exit(2);
    };

    let settings = Settings::load(&paths);

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

    let ingestor = Ingestor::new(llm, index, &settings);
    let report = ingestor
        .ingest_pdf(Path::new(pdf_path))
        .await
        .with_context(|| format!("Failed to ingest {}", pdf_path))?;

    tracing::info!("ingestion complete: {} chunks indexed", report.chunks);

    Ok(())
}
