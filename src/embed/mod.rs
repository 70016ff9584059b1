//! Embedding contract and implementations.
//!
//! The retrieval core treats the embedding model as an injected capability:
//! text in, fixed-length vector out. The same embedder (id and dimension)
//! must be used at build time and query time — vectors across models are
//! not comparable, so the corpus artifact records the embedder identity and
//! loads refuse a mismatch.

mod http;
mod ngram;

pub use http::HttpEmbedder;
pub use ngram::NgramEmbedder;

use thiserror::Error;

use crate::config::EmbeddingConfig;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding backend returned malformed output: {0}")]
    Malformed(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding configuration error: {0}")]
    Config(String),
}

/// Maps text to a fixed-length vector. Batch embedding exists for
/// build-time throughput; query time embeds single items.
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in the corpus artifact, e.g.
    /// `char-ngram-v1` or the remote model name.
    fn id(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Instantiate the embedder selected by configuration.
pub fn from_config(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbedError> {
    match config.provider.as_str() {
        "ngram" => Ok(Box::new(NgramEmbedder::new(config.dimension))),
        "http" => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                EmbedError::Config("http embedder requires embedding.base_url".into())
            })?;
            Ok(Box::new(HttpEmbedder::new(
                base_url,
                &config.model,
                config.dimension,
                config.api_key.as_deref(),
            )))
        }
        other => Err(EmbedError::Config(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_defaults_to_ngram() {
        let embedder = from_config(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.id(), "char-ngram-v1");
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn http_without_base_url_is_a_config_error() {
        let config = EmbeddingConfig {
            provider: "http".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(from_config(&config), Err(EmbedError::Config(_))));
    }
}
