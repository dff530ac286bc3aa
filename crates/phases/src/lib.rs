//! Phase runners: the five-step duplicate-detection pipeline run by one
//! scan — ingest, intent extraction, embedding, candidate search
//! (`detect`), pairwise verification (plus the `clique` grouping it feeds),
//! and ranking. Each phase consumes and produces well-typed data and is
//! resumable: no phase keeps state in memory that isn't also recorded in
//! the scan's `phase_cursor` or the PR cache fields.

pub mod clique;
pub mod cursor;
pub mod detect;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod intent;
pub mod rank;
pub mod text;
pub mod verify;

pub use error::{PhaseError, Result};
