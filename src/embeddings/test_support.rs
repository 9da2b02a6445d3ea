use anyhow::{Result, anyhow};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Embedder;

/// Words grouped by topic; each topic is one vector axis
const TOPICS: &[&[&str]] = &[
    &["diabetes", "blood", "sugar", "glucose", "insulin", "glycemic"],
    &["cardiac", "heart", "surgery", "cardiology", "artery"],
    &["management", "guide", "treatment", "protocol", "care", "therapy"],
    &["asthma", "lung", "inhaler", "breathing", "respiratory"],
];

/// Deterministic embedder that counts topic words and L2-normalizes the result.
#[derive(Debug, Default)]
pub(crate) struct KeywordEmbedder {
    pub(crate) batch_calls: AtomicUsize,
    pub(crate) warm_ups: AtomicUsize,
    /// Every text passed to `embed_batch`, in call order
    pub(crate) inputs: Mutex<Vec<String>>,
}

impl KeywordEmbedder {
    pub(crate) fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; TOPICS.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            for (axis, words) in TOPICS.iter().enumerate() {
                if words.contains(&word.as_str()) {
                    vector[axis] += 1.0;
                }
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        "keyword-test"
    }

    fn dimension(&self) -> usize {
        TOPICS.len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.inputs
            .lock()
            .expect("inputs lock poisoned")
            .extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn warm_up(&self) -> Result<()> {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Embedder whose every call fails
#[derive(Debug, Default)]
pub(crate) struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model(&self) -> &str {
        "failing-test"
    }

    fn dimension(&self) -> usize {
        TOPICS.len()
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding server unavailable"))
    }
}
