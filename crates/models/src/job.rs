use serde::{Deserialize, Serialize};

use crate::Id;

/// JobType maps a queued job to the phase handler that serves it. Stored as
/// a small integer so the queue's dequeue query can filter on `= ANY($1)`
/// without a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx-support", sqlx(transparent))]
pub struct JobType(pub i16);

impl JobType {
    pub const SCAN: JobType = JobType(0);
    pub const INGEST: JobType = JobType(1);
    pub const DETECT: JobType = JobType(2);
}

/// JobStatus is the lifecycle of one queued unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx-support", sqlx(type_name = "job_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

/// Job is a unit of deferred work. Jobs are process-wide: any worker may
/// claim any queued job whose `run_after` has elapsed, regardless of which
/// worker enqueued it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Job {
    pub id: Id,
    pub scan_id: Id,
    pub job_type: JobType,
    #[cfg_attr(feature = "sqlx-support", sqlx(json))]
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_retries: i32,
    pub run_after: chrono::DateTime<chrono::Utc>,
    pub last_error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// ScanJobPayload is the payload of a `scan` job: enough to create (or
/// find) the scan row and kick off ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJobPayload {
    pub scan_id: Id,
    pub repo_id: Id,
    pub account_id: Id,
    pub full: bool,
    #[serde(default)]
    pub max_prs: Option<i64>,
}

/// IngestJobPayload additionally carries `last_scan_at` for incremental
/// ingest; absent or null means a full listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJobPayload {
    pub scan_id: Id,
    pub repo_id: Id,
    pub account_id: Id,
    pub full: bool,
    #[serde(default)]
    pub max_prs: Option<i64>,
    #[serde(default)]
    pub last_scan_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DetectJobPayload carries the ingest snapshot that the rest of the
/// pipeline (intent, embed, candidate search, verify, clique grouping,
/// rank) operates over — a consistent PR set, not "all open PRs in the DB".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectJobPayload {
    pub scan_id: Id,
    pub repo_id: Id,
    pub account_id: Id,
    pub pr_numbers: Vec<i64>,
}
