/// Error is the Store's error type. Almost everything bottoms out in a
/// `sqlx::Error`; `Invariant` is reserved for states that should be
/// impossible given the schema's constraints (e.g. a pairwise cache pair
/// that somehow arrived unsorted) and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error")]
    Db(#[from] sqlx::Error),
    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
