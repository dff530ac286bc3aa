//! Core domain types shared by the dupescan store, queue, and phase
//! runners: accounts, repos, PRs, scans, jobs, pairwise cache entries, and
//! duplicate groups. This crate holds no I/O — only types, the content-hash
//! algorithm, and small pure helpers (status transitions, pair ordering).

mod account;
mod content_hash;
mod dupe_group;
mod id;
mod job;
mod pairwise;
mod pr;
mod repo;
mod scan;
#[allow(unused_imports)]
mod sqlx_json;
pub mod verdict;

pub use account::{Account, AccountConfig, ProviderConfig, ProviderKind};
pub use content_hash::{diff_hash, normalize_diff, ContentHash};
pub use dupe_group::{DupeGroup, DupeGroupMember};
pub use id::{Id, IdGenerator};
pub use job::{DetectJobPayload, IngestJobPayload, Job, JobStatus, JobType, ScanJobPayload};
pub use pairwise::{PairKey, PairwiseCacheEntry};
pub use pr::{Pr, PrState, PrUpsert};
pub use repo::Repo;
pub use scan::{token_key, PhaseCursor, Scan, ScanStatus, TokenUsage};
pub use verdict::{RawVerdict, Relationship, Verdict};

sqlx_json::sqlx_json!(AccountConfig);
sqlx_json::sqlx_json!(PhaseCursor);
