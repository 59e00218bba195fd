//! A deterministic, model-free embedding provider.
//!
//! Hashes whitespace tokens into a fixed-dimension vector (a signed
//! feature-hashing scheme, the same trick bloom filters and `HashingVectorizer`
//! use) and unit-normalizes the result. No model to load, no network
//! call, no GPU — exactly the contract §4.1 requires and nothing more,
//! so the rest of the workspace can be exercised without a real model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::{EmbeddingError, EmbeddingProvider};

const DEFAULT_DIMENSIONS: usize = 256;

#[derive(Debug, Clone)]
pub struct LocalHashEmbedder {
    dimensions: usize,
}

impl LocalHashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        assert!(dimensions > 0, "embedding dimension must be positive");
        Self { dimensions }
    }

    fn hash_token(token: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for LocalHashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalHashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0f32; self.dimensions];

        for token in text.split_whitespace() {
            let lower = token.to_lowercase();
            let hash = Self::hash_token(&lower);
            let index = (hash as usize) % self.dimensions;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        } else {
            // Degenerate input (empty text): fall back to a fixed unit
            // vector so callers never divide by zero downstream.
            vector[0] = 1.0;
        }

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "local-hash-embedder-v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(vector: &[f32]) -> f32 {
        vector.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn embeddings_are_unit_normalized() {
        let embedder = LocalHashEmbedder::new();
        let vector = embedder.embed("navigate to a URL").await.unwrap();
        assert!((norm(&vector) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn same_text_yields_byte_identical_vector() {
        let embedder = LocalHashEmbedder::new();
        let a = embedder.embed("take a screenshot").await.unwrap();
        let b = embedder.embed("take a screenshot").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_yields_different_vector() {
        let embedder = LocalHashEmbedder::new();
        let a = embedder.embed("open a web page").await.unwrap();
        let b = embedder.embed("take a screenshot").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn respects_configured_dimensions() {
        let embedder = LocalHashEmbedder::with_dimensions(32);
        let vector = embedder.embed("hello world").await.unwrap();
        assert_eq!(vector.len(), 32);
        assert_eq!(embedder.dimensions(), 32);
    }

    #[tokio::test]
    async fn empty_text_still_returns_a_unit_vector() {
        let embedder = LocalHashEmbedder::new();
        let vector = embedder.embed("").await.unwrap();
        assert!((norm(&vector) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn embed_batch_matches_sequential_embed() {
        let embedder = LocalHashEmbedder::new();
        let texts = ["open a web page", "take a screenshot"];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        for (text, vector) in texts.iter().zip(batch.iter()) {
            let single = embedder.embed(text).await.unwrap();
            assert_eq!(&single, vector);
        }
    }
}
