// Embeddings module
// Text-to-vector providers behind a common trait

pub mod hashing;
pub mod ollama;

use std::sync::Arc;

use crate::Result;
use crate::config::{Config, ProviderKind};

pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;

/// Maps text to fixed-dimension vectors.
///
/// Implementations must be deterministic for a fixed model: the same text
/// always lands in the same neighborhood. `embed_batch` returns one vector
/// per input, in input order.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Dimensionality of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Identifies the model so artifacts built with another model are detected
    fn model_id(&self) -> String;
}

/// Construct the provider selected in the configuration
#[inline]
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let dimension = config.embedding.dimension as usize;
    match config.embedding.provider {
        ProviderKind::Ollama => Ok(Arc::new(
            OllamaClient::new(&config.ollama)?.with_dimension(dimension),
        )),
        ProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(dimension))),
    }
}
