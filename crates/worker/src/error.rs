/// Error is the reason a dispatched job was reported back to the queue as
/// having failed, distinct from the job's own `last_error` text (which is
/// this error's `Display`).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] orchestrator::Error),
    #[error("invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("no handler registered for job type {0:?}")]
    UnknownJobType(models::JobType),
}

pub type Result<T> = std::result::Result<T, Error>;
