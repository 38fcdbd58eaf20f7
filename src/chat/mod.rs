//! Question answering: input guard, retrieval, composition, persistence.

use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::history::SessionStore;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::context_builder::{build_context, build_prompt, build_web_block};
use crate::rag::VectorIndex;
use crate::search::TavilyClient;

/// Truncate `input` to its first `max_words` words. Returns the (possibly
/// truncated) input and whether truncation happened; untouched input passes
/// through unchanged.
pub fn limit_input(input: &str, max_words: usize) -> (String, bool) {
    let words: Vec<&str> = input.split_whitespace().collect();
    if words.len() <= max_words {
        return (input.to_string(), false);
    }
    (words[..max_words].join(" "), true)
}

#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub exchange_id: i64,
    pub answer: String,
    pub truncated: bool,
}

/// One question/answer interaction: guard input, embed, retrieve nearest
/// chunks and web snippets, compose the prompt, complete, persist.
pub struct ChatEngine {
    llm: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    search: Option<TavilyClient>,
    store: SessionStore,
    settings: Settings,
}

impl ChatEngine {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
        search: Option<TavilyClient>,
        store: SessionStore,
        settings: Settings,
    ) -> Self {
        Self {
            llm,
            index,
            search,
            store,
            settings,
        }
    }

    pub async fn answer(&self, username: &str, raw_input: &str) -> Result<AnswerOutcome, ApiError> {
        let (question, truncated) = limit_input(raw_input, self.settings.input_word_limit);
        if question.trim().is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".to_string()));
        }

        let embeddings = self.llm.embed(std::slice::from_ref(&question)).await?;
        let query_vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Upstream("embedding service returned no vector".to_string()))?;

        // Retrieval and web search are independent of each other; both must
        // finish before composition, so they run concurrently.
        let retrieval = self.index.query(&query_vector, self.settings.retrieval_top_k);
        let web = async {
            match &self.search {
                Some(client) => Some(client.search(&question).await),
                None => None,
            }
        };
        let (matches, web_outcome) = tokio::join!(retrieval, web);
        let matches = matches?;

        let context = build_context(&matches);
        let web_block = build_web_block(web_outcome);
        let prompt = build_prompt(&question, &context, web_block.as_deref());

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_max_tokens(self.settings.answer_max_tokens);
        let answer = self.llm.chat(&request).await?;

        let exchange_id = self.store.save_exchange(username, &question, &answer).await?;

        Ok(AnswerOutcome {
            exchange_id,
            answer,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::rag::{SqliteVectorIndex, VectorRecord};

    #[test]
    fn short_input_passes_through_unchanged() {
        let (output, truncated) = limit_input("what happened in 1867", 20);
        assert_eq!(output, "what happened in 1867");
        assert!(!truncated);
    }

    #[test]
    fn long_input_is_truncated_to_the_first_twenty_words() {
        let input = "one two three four five six seven eight nine ten eleven twelve \
                     thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty twentyone";
        let (output, truncated) = limit_input(input, 20);

        assert!(truncated);
        assert_eq!(output.split_whitespace().count(), 20);
        assert_eq!(
            output,
            "one two three four five six seven eight nine ten eleven twelve \
             thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty"
        );
    }

    #[test]
    fn exactly_at_the_limit_is_not_truncated() {
        let input = (1..=20).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let (output, truncated) = limit_input(&input, 20);
        assert!(!truncated);
        assert_eq!(output, input);
    }

    struct FixedProvider {
        vector: Vec<f32>,
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
            assert_eq!(request.messages.len(), 1);
            Ok(self.reply.clone())
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(vec![self.vector.clone(); inputs.len()])
        }
    }

    async fn test_engine(reply: &str) -> (ChatEngine, SessionStore) {
        let settings = Settings {
            embed_dimension: 3,
            ..Settings::default()
        };

        let tmp_dir = std::env::temp_dir();
        let store = SessionStore::new(
            tmp_dir.join(format!("chronicle-chat-test-{}.db", uuid::Uuid::new_v4())),
        )
        .await
        .unwrap();

        let index = SqliteVectorIndex::with_path(
            tmp_dir.join(format!("chronicle-chat-vec-{}.db", uuid::Uuid::new_v4())),
        )
        .await
        .unwrap();
        index.ensure_ready(3).await.unwrap();
        index
            .upsert(VectorRecord {
                id: "chunk-0".to_string(),
                values: vec![1.0, 0.0, 0.0],
                text: "The confederation was formed in 1867.".to_string(),
            })
            .await
            .unwrap();

        let llm = Arc::new(FixedProvider {
            vector: vec![1.0, 0.0, 0.0],
            reply: reply.to_string(),
        });

        let engine = ChatEngine::new(llm, Arc::new(index), None, store.clone(), settings);
        (engine, store)
    }

    #[tokio::test]
    async fn answer_persists_the_exchange() {
        let (engine, store) = test_engine("It was formed in 1867.").await;

        let outcome = engine
            .answer("alice", "when was the confederation formed")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "It was formed in 1867.");
        assert!(!outcome.truncated);

        let history = store.get_history("alice", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, outcome.exchange_id);
        assert_eq!(history[0].user_message, "when was the confederation formed");
        assert_eq!(history[0].bot_response, "It was formed in 1867.");
    }

    #[tokio::test]
    async fn answer_rejects_empty_input() {
        let (engine, _store) = test_engine("unused").await;
        let result = engine.answer("alice", "   ").await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn overlong_question_is_truncated_before_persisting() {
        let (engine, store) = test_engine("answer").await;

        let input = (1..=25).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let outcome = engine.answer("alice", &input).await.unwrap();

        assert!(outcome.truncated);
        let history = store.get_history("alice", 1).await.unwrap();
        assert_eq!(history[0].user_message.split_whitespace().count(), 20);
    }
}
