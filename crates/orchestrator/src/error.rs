/// Error is the orchestrator's own error surface, layering the scan state
/// machine's bookkeeping failures over the lower crates it drives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] store::Error),
    #[error("queue error: {0}")]
    Queue(#[from] queue::Error),
    #[error("resolver error: {0}")]
    Resolver(#[from] resolver::Error),
    #[error("phase error: {0}")]
    Phase(#[from] phases::PhaseError),
    #[error("scan {0:?} not found")]
    ScanNotFound(models::Id),
    #[error("repo {0:?} not found")]
    RepoNotFound(models::Id),
}

pub type Result<T> = std::result::Result<T, Error>;
