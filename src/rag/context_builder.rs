//! Prompt assembly for retrieval-augmented answers.
//!
//! Retrieved chunk texts (already ordered by descending similarity) become
//! one context block; web snippets, when search is configured, become a
//! second labeled block. A failed web search degrades to an inline
//! placeholder instead of failing the interaction.

use super::store::QueryMatch;
use crate::core::errors::ApiError;
use crate::search::SearchSnippet;

/// Join retrieved chunk texts with blank lines, preserving store order.
pub fn build_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .map(|m| m.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the web-data block. `None` when search is not configured; the
/// placeholder string when a configured search failed.
pub fn build_web_block(
    outcome: Option<Result<Vec<SearchSnippet>, ApiError>>,
) -> Option<String> {
    match outcome {
        None => None,
        Some(Ok(snippets)) => Some(
            snippets
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        ),
        Some(Err(err)) => {
            tracing::warn!("web search failed, continuing without it: {}", err);
            Some(format!("Web search unavailable: {}", err))
        }
    }
}

/// Fixed instruction template embedding the question, the retrieved-context
/// block, and (when present) the web-data block.
pub fn build_prompt(question: &str, context: &str, web_block: Option<&str>) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are a knowledgeable research assistant answering questions about a \
         document corpus. Your goal is to provide factually accurate, detailed, \
         well-structured responses grounded in the material below.\n\n",
    );

    prompt.push_str("User question:\n");
    prompt.push_str(question);
    prompt.push_str("\n\n");

    prompt.push_str("Retrieved context from the document corpus:\n");
    if context.is_empty() {
        prompt.push_str("(no matching passages found)");
    } else {
        prompt.push_str(context);
    }
    prompt.push_str("\n\n");

    if let Some(web) = web_block {
        prompt.push_str("Additional web data (real-time information):\n");
        if web.is_empty() {
            prompt.push_str("(no web results)");
        } else {
            prompt.push_str(web);
        }
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "Guidelines: prioritize the retrieved context; if web data is available, \
         cross-check and enhance the response with it; if the material does not \
         cover the question, acknowledge the gap and suggest alternative sources.\n\n\
         Answer format:\n\
         - Summary (2-3 sentences)\n\
         - Detailed explanation\n\
         - References (which context or web passages you relied on)\n",
    );

    prompt
}
