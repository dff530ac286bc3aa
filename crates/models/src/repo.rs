use serde::{Deserialize, Serialize};

use crate::Id;

/// Repo is an (owner, name) pair tracked for scanning. `last_scan_at` drives
/// incremental ingest: the next scan's ingest phase asks the code host for
/// only PRs updated since this timestamp.
///
/// Deleting a repo cascades to its PRs, scans, jobs, dupe groups, and
/// pairwise cache entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Repo {
    pub id: Id,
    pub account_id: Id,
    pub owner: String,
    pub name: String,
    pub last_scan_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Repo {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}
