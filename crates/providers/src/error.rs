/// CodeHostError is the typed error surface of [`crate::code_host::CodeHostClient`].
/// Callers (the ingest phase) match on the variant to decide retry policy:
/// `RateLimited` and `Transient` go back through the job queue's backoff;
/// `DiffTooLarge` is recorded on the individual PR and the phase continues;
/// `NotFound` generally means the PR vanished between listing and fetch.
#[derive(Debug, thiserror::Error)]
pub enum CodeHostError {
    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("diff too large to fetch")]
    DiffTooLarge,
    #[error("transient error: {0}")]
    Transient(String),
}

/// EmbeddingError surfaces from both the sync and async-batch embedding
/// paths.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("rate limited")]
    RateLimited,
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("timed out waiting for batch {batch_id}")]
    BatchTimeout { batch_id: String },
    #[error("transient error: {0}")]
    Transient(String),
}

/// ChatError mirrors [`EmbeddingError`] for the chat provider. Per-item
/// malformed responses within a batch are NOT represented here — those
/// surface as `Ok` batch entries whose payload itself signals the parse
/// failure, so one bad item never aborts the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("rate limited")]
    RateLimited,
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("timed out waiting for batch {batch_id}")]
    BatchTimeout { batch_id: String },
    #[error("transient error: {0}")]
    Transient(String),
}

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("transient error: {0}")]
    Transient(String),
}
