use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use relay_agent_model::{EmbeddingProvider, ErrorKind, ModelProviderError};

use crate::Error;

/// A deterministic embedder for testing purpose.
///
/// Each character is hashed into one of `dimension` buckets, so texts
/// sharing more characters end up closer to each other.
#[derive(Clone)]
pub struct TestEmbeddingProvider {
    dimension: usize,
    fail_marker: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl TestEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            fail_marker: None,
            calls: Default::default(),
        }
    }

    /// Makes the embedder fail on texts containing `marker`.
    pub fn fail_on<S: Into<String>>(mut self, marker: S) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Returns how many times `embed` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Computes the vector without touching the call counter.
    pub fn vector_of(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for ch in text.chars() {
            vector[ch as usize % self.dimension] += 1.0;
        }
        vector
    }
}

impl Default for TestEmbeddingProvider {
    fn default() -> Self {
        Self::new(32)
    }
}

#[async_trait]
impl EmbeddingProvider for TestEmbeddingProvider {
    async fn embed(
        &self,
        text: &str,
    ) -> Result<Vec<f32>, Box<dyn ModelProviderError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .fail_marker
            .as_deref()
            .is_some_and(|marker| text.contains(marker));
        if should_fail {
            return Err(Box::new(Error {
                message: "embedding failed",
                kind: ErrorKind::Unavailable,
            }));
        }
        Ok(self.vector_of(text))
    }
}
