//! Deterministic hashed character n-gram embedder.
//!
//! Self-contained fallback for builds and tests with no external embedding
//! service: words and their character trigrams are hashed into a
//! fixed-length bag-of-features vector, L2-normalized. Lexically similar
//! passages land close in cosine space. Not a semantic model — deployments
//! that want one point the `http` provider at a real embedding server.

use super::{EmbedError, Embedder};

const EMBEDDER_ID: &str = "char-ngram-v1";

/// Weight of a whole-word feature relative to a trigram feature.
const WORD_WEIGHT: f32 = 2.0;

pub struct NgramEmbedder {
    dimension: usize,
}

impl NgramEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for NgramEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl Embedder for NgramEmbedder {
    fn id(&self) -> &str {
        EMBEDDER_ID
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dimension];

        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if word.is_empty() {
                continue;
            }

            let bucket = fnv1a(word.as_bytes()) as usize % self.dimension;
            vector[bucket] += WORD_WEIGHT;

            // Padded trigrams capture morphology ("diabetic"/"diabetes").
            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                let bucket = fnv1a(gram.as_bytes()) as usize % self.dimension;
                vector[bucket] += 1.0;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn embedding_is_deterministic_and_normalized() {
        let embedder = NgramEmbedder::default();
        let a = embedder.embed("atrial fibrillation management").unwrap();
        let b = embedder.embed("atrial fibrillation management").unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_text_scores_above_unrelated() {
        let embedder = NgramEmbedder::default();
        let query = embedder.embed("hypertension management").unwrap();
        let on_topic = embedder
            .embed("management of arterial hypertension requires blood pressure control")
            .unwrap();
        let off_topic = embedder
            .embed("rate control strategies in atrial fibrillation with anticoagulation")
            .unwrap();
        assert!(cosine(&query, &on_topic) > cosine(&query, &off_topic));
    }

    #[test]
    fn empty_text_is_a_zero_vector() {
        let embedder = NgramEmbedder::default();
        let v = embedder.embed("").unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
        assert_eq!(v.len(), NgramEmbedder::DEFAULT_DIMENSION);
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let embedder = NgramEmbedder::default();
        let a = embedder.embed("Heart Failure!").unwrap();
        let b = embedder.embed("heart failure").unwrap();
        assert_eq!(a, b);
    }
}
