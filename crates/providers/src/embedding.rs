use async_trait::async_trait;

use crate::error::EmbeddingError;

/// EmbedRequest pairs an opaque request id (round-tripped so callers can
/// match results back to PRs) with the text to embed.
#[derive(Debug, Clone)]
pub struct EmbedRequest {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct EmbedResult {
    pub id: String,
    pub vector: Vec<f32>,
}

/// BatchOptions threads a previously observed batch id back into a batch
/// submission so a resumed phase polls the same batch instead of
/// resubmitting it, and carries a callback invoked exactly once with the
/// newly created batch id so the caller can persist it into `phase_cursor`
/// before this call returns (which may be hours later).
pub struct BatchOptions<'a> {
    pub existing_batch_id: Option<String>,
    pub on_batch_created: Option<Box<dyn FnMut(String) + Send + 'a>>,
}

impl<'a> Default for BatchOptions<'a> {
    fn default() -> Self {
        Self {
            existing_batch_id: None,
            on_batch_created: None,
        }
    }
}

/// EmbeddingProvider is the synchronous embedding contract every provider
/// must implement.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimensions(&self) -> usize;
    fn max_input_tokens(&self) -> usize;
    fn count_tokens(&self, text: &str) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// EmbeddingBatchProvider is the optional async-batch capability: some
/// embedding providers can accept a large batch of requests, return a
/// batch id immediately, and resolve the full result set only once the
/// provider finishes processing it (which can take minutes to hours).
/// Consumers test for this capability at runtime via the `resolver` crate's
/// `EmbeddingHandle` rather than assuming it.
#[async_trait]
pub trait EmbeddingBatchProvider: EmbeddingProvider {
    async fn embed_batch<'a>(
        &self,
        requests: &[EmbedRequest],
        options: BatchOptions<'a>,
    ) -> Result<Vec<EmbedResult>, EmbeddingError>;
}
