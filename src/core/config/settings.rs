use std::env;
use std::fs;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

/// Runtime settings, loaded once at startup and passed explicitly into every
/// adapter constructor. Service credentials always come from the environment;
/// the optional `config.yml` covers the tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub openai_api_key: String,
    pub pinecone_api_key: String,
    pub tavily_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embed_model: String,
    pub embed_dimension: usize,
    pub index_name: String,
    pub index_cloud: String,
    pub index_region: String,
    pub chunk_max_words: usize,
    pub retrieval_top_k: usize,
    pub input_word_limit: usize,
    pub answer_max_tokens: i32,
    pub search_max_results: usize,
    pub history_limit: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            pinecone_api_key: String::new(),
            tavily_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4-turbo".to_string(),
            embed_model: "text-embedding-3-small".to_string(),
            embed_dimension: 1536,
            index_name: "history-index".to_string(),
            index_cloud: "aws".to_string(),
            index_region: "us-east-1".to_string(),
            chunk_max_words: 100,
            retrieval_top_k: 5,
            input_word_limit: 20,
            answer_max_tokens: 512,
            search_max_results: 2,
            history_limit: 10,
        }
    }
}

impl Settings {
    pub fn load(paths: &AppPaths) -> Self {
        let mut settings = if paths.config_path.exists() {
            match fs::read_to_string(&paths.config_path) {
                Ok(contents) => match serde_yaml::from_str::<Settings>(&contents) {
                    Ok(settings) => settings,
                    Err(err) => {
                        tracing::warn!(
                            "Failed to parse {}: {}; using defaults",
                            paths.config_path.display(),
                            err
                        );
                        Settings::default()
                    }
                },
                Err(err) => {
                    tracing::warn!(
                        "Failed to read {}: {}; using defaults",
                        paths.config_path.display(),
                        err
                    );
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        // Credentials from the environment win over anything in config.yml.
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings.openai_api_key = key;
        }
        if let Ok(key) = env::var("PINECONE_API_KEY") {
            settings.pinecone_api_key = key;
        }
        if let Ok(key) = env::var("TAVILY_API_KEY") {
            settings.tavily_api_key = key;
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_configuration() {
        let settings = Settings::default();
        assert_eq!(settings.embed_dimension, 1536);
        assert_eq!(settings.chunk_max_words, 100);
        assert_eq!(settings.input_word_limit, 20);
        assert_eq!(settings.index_name, "history-index");
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let parsed: Settings = serde_yaml::from_str("retrieval_top_k: 3\n").unwrap();
        assert_eq!(parsed.retrieval_top_k, 3);
        assert_eq!(parsed.embed_dimension, 1536);
        assert_eq!(parsed.chat_model, "gpt-4-turbo");
    }
}
