use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// Connection settings for the Together AI endpoints serving chat
/// completions and embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl UpstreamSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.together.xyz".to_string(),
            api_key: String::new(),
            chat_model: "meta-llama/Llama-3-70b-chat-hf".to_string(),
            embedding_model: "togethercomputer/m2-bert-80M-8k-retrieval".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Number of passages retrieved per query.
    pub top_k: usize,
    /// Name of the single shared index collection.
    pub collection: String,
    pub upstream: UpstreamSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 2,
            collection: "user_documents".to_string(),
            upstream: UpstreamSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults overridden by environment variables where present.
    pub fn from_env() -> Result<Self, ApiError> {
        let mut settings = Settings::default();

        if let Some(size) = env_usize("DOCUCHAT_CHUNK_SIZE") {
            settings.chunk_size = size;
        }
        if let Some(overlap) = env_usize("DOCUCHAT_CHUNK_OVERLAP") {
            settings.chunk_overlap = overlap;
        }
        if let Some(top_k) = env_usize("DOCUCHAT_TOP_K") {
            settings.top_k = top_k;
        }
        if let Ok(name) = env::var("DOCUCHAT_COLLECTION") {
            if !name.trim().is_empty() {
                settings.collection = name;
            }
        }
        if let Ok(url) = env::var("TOGETHER_BASE_URL") {
            if !url.trim().is_empty() {
                settings.upstream.base_url = url;
            }
        }
        if let Ok(key) = env::var("TOGETHER_API_KEY") {
            settings.upstream.api_key = key;
        }
        if let Ok(model) = env::var("TOGETHER_CHAT_MODEL") {
            if !model.trim().is_empty() {
                settings.upstream.chat_model = model;
            }
        }
        if let Ok(model) = env::var("TOGETHER_EMBEDDING_MODEL") {
            if !model.trim().is_empty() {
                settings.upstream.embedding_model = model;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.chunk_size == 0 {
            return Err(ApiError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ApiError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(ApiError::Configuration(
                "top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.chunk_overlap, 200);
        assert_eq!(settings.top_k, 2);
        assert_eq!(settings.collection, "user_documents");
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let settings = Settings {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ApiError::Configuration(_))
        ));
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let settings = Settings {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ApiError::Configuration(_))
        ));
    }
}
