// Embeddings module
// Turns document and question text into fixed-size vectors

pub mod ollama;

#[cfg(test)]
pub(crate) mod test_support;

use anyhow::{Result, anyhow};

pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};

/// A text encoder producing vectors of a single fixed dimension.
///
/// Documents and questions must go through the same embedder, otherwise the
/// distances returned by the index are meaningless.
pub trait Embedder: Send + Sync {
    /// Name of the model behind this embedder
    fn model(&self) -> &str;

    /// Length of every vector returned by this embedder
    fn dimension(&self) -> usize;

    /// Embed all texts, returning one vector per input in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow!("Embedder returned no vector for a single input"))
    }

    /// Prepare the model before the first request. Called at most once per service.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
