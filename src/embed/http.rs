//! HTTP embedding backend.
//!
//! Client for an external embedding server speaking a minimal JSON
//! protocol: `POST {base_url}/embed` with `{"model": ..., "input": [...]}`
//! returns `{"embeddings": [[f32, ...], ...]}`, one vector per input in
//! order. The retrieval path is synchronous, so this uses the blocking
//! reqwest client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{EmbedError, Embedder};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct HttpEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model: &str, dimension: usize, api_key: Option<&str>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: format!("{}/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimension,
            api_key: api_key.map(str::to_string),
        }
    }

    fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbedRequest {
            model: &self.model,
            input,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?.error_for_status()?;
        let body: EmbedResponse = response.json()?;

        if body.embeddings.len() != input.len() {
            return Err(EmbedError::Malformed(format!(
                "requested {} embeddings, got {}",
                input.len(),
                body.embeddings.len()
            )));
        }
        for vector in &body.embeddings {
            if vector.len() != self.dimension {
                return Err(EmbedError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        Ok(body.embeddings)
    }
}

impl Embedder for HttpEmbedder {
    fn id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.request(&[text.to_string()])?;
        Ok(vectors.remove(0))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }
}
