use providers::error::{ChatError, CodeHostError, EmbeddingError, VectorStoreError};

/// PhaseError is the error surface every phase runner returns. The
/// orchestrator inspects [`PhaseError::is_retryable`] to decide whether to
/// requeue the owning job (transient provider trouble, subject to the
/// queue's backoff) or fail the scan outright (quota exhaustion, an
/// invariant violation, anything the queue retrying won't fix).
///
/// Per-item trouble — a single malformed chat response, one PR's diff being
/// too large — is never represented here: phases record those inline on the
/// affected row (a `parse_error` verdict, a null `diff_hash`) and continue.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("store error: {0}")]
    Store(#[from] store::Error),
    #[error("transient provider error: {0}")]
    Transient(String),
    #[error("provider quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("provider batch timed out: {0}")]
    BatchTimeout(String),
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl PhaseError {
    /// is_retryable mirrors §7's error taxonomy: transient provider trouble
    /// goes back through the queue's backoff, everything else fails the
    /// scan without a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PhaseError::Transient(_))
    }
}

impl From<CodeHostError> for PhaseError {
    fn from(err: CodeHostError) -> Self {
        match err {
            CodeHostError::RateLimited { .. } | CodeHostError::Transient(_) => PhaseError::Transient(err.to_string()),
            CodeHostError::NotFound(_) => PhaseError::Invariant(err.to_string()),
            CodeHostError::DiffTooLarge => {
                PhaseError::Invariant("diff_too_large must be handled inline by the caller".into())
            }
        }
    }
}

impl From<EmbeddingError> for PhaseError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::RateLimited | EmbeddingError::Transient(_) => PhaseError::Transient(err.to_string()),
            EmbeddingError::QuotaExhausted(msg) => PhaseError::QuotaExhausted(msg),
            EmbeddingError::BatchTimeout { batch_id } => PhaseError::BatchTimeout(batch_id),
        }
    }
}

impl From<ChatError> for PhaseError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::RateLimited | ChatError::Transient(_) => PhaseError::Transient(err.to_string()),
            ChatError::QuotaExhausted(msg) => PhaseError::QuotaExhausted(msg),
            ChatError::BatchTimeout { batch_id } => PhaseError::BatchTimeout(batch_id),
        }
    }
}

impl From<VectorStoreError> for PhaseError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::Transient(msg) => PhaseError::Transient(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, PhaseError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transient_is_retryable() {
        assert!(PhaseError::Transient("boom".into()).is_retryable());
    }

    #[test]
    fn test_quota_exhausted_is_not_retryable() {
        assert!(!PhaseError::QuotaExhausted("card declined".into()).is_retryable());
    }
}
