//! Runtime configuration for the retrieval core.
//!
//! All tunable policy constants (chunk window, overfetch factor, dedup
//! threshold, embedding backend) live here so deployments can adjust them
//! from a TOML file instead of recompiling.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Chunking parameters, in words.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target window size per chunk.
    pub window_words: usize,
    /// Window advance; must not exceed `window_words`. Overlap between
    /// consecutive chunks is `window_words - stride_words`.
    pub stride_words: usize,
    /// A trailing window shorter than this is merged into the previous
    /// chunk of the same page instead of being emitted on its own.
    pub min_chunk_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_words: 800,
            stride_words: 700,
            min_chunk_words: 50,
        }
    }
}

/// Embedding backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider: "ngram" (built-in, deterministic) or "http".
    pub provider: String,
    /// Model identifier reported by the backend.
    pub model: String,
    /// Dimensions of the embedding vectors.
    pub dimension: usize,
    /// Base URL of the embedding server (for "http").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Optional bearer token (for "http").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ngram".to_string(),
            model: "char-ngram-v1".to_string(),
            dimension: 384,
            base_url: None,
            api_key: None,
        }
    }
}

/// Top-level configuration for corpus builds and query-time retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    /// How many candidates to request from the index per `top_k` result,
    /// to absorb deduplication losses.
    pub overfetch_factor: usize,
    /// Word-set Jaccard threshold above which two same-page results are
    /// considered duplicates.
    pub dedup_overlap: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            overfetch_factor: Self::DEFAULT_OVERFETCH,
            dedup_overlap: Self::DEFAULT_DEDUP_OVERLAP,
        }
    }
}

impl RetrievalConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.window_words == 0 {
            return Err(ConfigError::Invalid("window_words must be positive".into()));
        }
        if self.chunking.stride_words == 0 || self.chunking.stride_words > self.chunking.window_words
        {
            return Err(ConfigError::Invalid(format!(
                "stride_words must be in 1..={}",
                self.chunking.window_words
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimension must be positive".into(),
            ));
        }
        if self.overfetch_factor == 0 {
            return Err(ConfigError::Invalid(
                "overfetch_factor must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dedup_overlap) {
            return Err(ConfigError::Invalid(
                "dedup_overlap must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

impl RetrievalConfig {
    pub const DEFAULT_OVERFETCH: usize = 3;
    pub const DEFAULT_DEDUP_OVERLAP: f32 = 0.6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.window_words, 800);
        assert_eq!(config.chunking.stride_words, 700);
    }

    #[test]
    fn parses_partial_toml() {
        let config: RetrievalConfig = toml::from_str(
            r#"
            overfetch_factor = 5

            [chunking]
            window_words = 200
            "#,
        )
        .unwrap();
        assert_eq!(config.overfetch_factor, 5);
        assert_eq!(config.chunking.window_words, 200);
        // untouched keys keep their defaults
        assert_eq!(config.chunking.stride_words, 700);
        assert_eq!(config.embedding.dimension, 384);
    }

    #[test]
    fn rejects_zero_stride() {
        let mut config = RetrievalConfig::default();
        config.chunking.stride_words = 0;
        assert!(config.validate().is_err());
    }
}
