//! Embedding provider interface and a dependency-free local implementation.
//!
//! Per the specification, the embedding-model provider itself is an
//! external collaborator: the core only depends on the `EmbeddingProvider`
//! trait below. `LocalHashEmbedder` is the one concrete implementation
//! this workspace ships, used as the default and in every test; a real
//! model-backed provider (FastEmbed, Ollama, a hosted API) is a drop-in
//! behind the same trait and is intentionally not vendored here.

mod hash_embedder;

use async_trait::async_trait;
use thiserror::Error;

pub use hash_embedder::LocalHashEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider failed: {0}")]
    Failed(String),
}

/// `embed(text) -> unit vector`, per §4.1.
///
/// Implementations must: return a fixed dimension `D` for the lifetime
/// of the process, return unit-normalized vectors, tolerate concurrent
/// calls, and be deterministic (same input, same output).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Default batch implementation embeds sequentially; providers backed
    /// by a batching API should override this.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
}
