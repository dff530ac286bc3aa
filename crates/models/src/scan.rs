use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Id;

/// ScanStatus is the scan state machine. Transitions are one-way and any
/// intermediate state may jump directly to `Failed`:
///
/// ```text
/// Queued -> Ingesting -> Embedding -> Detecting -> Verifying -> Ranking -> Done
///    \            \            \            \            \
///     `------------`------------`------------`------------`---> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx-support", sqlx(type_name = "scan_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Queued,
    Ingesting,
    Embedding,
    Detecting,
    Verifying,
    Ranking,
    Done,
    Failed,
}

impl ScanStatus {
    /// is_terminal is true for the two states a scan never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Done | ScanStatus::Failed)
    }

    /// next is the status this scan advances to on success of the phase
    /// named by the *current* status, or `None` if already terminal.
    pub fn next(self) -> Option<ScanStatus> {
        use ScanStatus::*;
        match self {
            Queued => Some(Ingesting),
            Ingesting => Some(Embedding),
            Embedding => Some(Detecting),
            Detecting => Some(Verifying),
            Verifying => Some(Ranking),
            Ranking => Some(Done),
            Done | Failed => None,
        }
    }
}

/// PhaseCursor is the opaque resume token threaded through a scan's
/// `phase_cursor` column. Only the key belonging to the currently running
/// phase is meaningful; a process restart resumes polling the named batch
/// id instead of submitting a new one. It's cleared on phase failure so the
/// next attempt starts fresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_intent_batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_batch_id: Option<String>,
}

impl PhaseCursor {
    pub fn is_empty(&self) -> bool {
        self == &PhaseCursor::default()
    }
}

/// TokenUsage accumulates input/output token counts for one phase, e.g.
/// `intent.input` / `intent.output`. Keys are the phase-qualified names used
/// verbatim in `Scan::token_usage`.
pub type TokenUsage = BTreeMap<String, u64>;

pub fn token_key(phase: &str, direction: &str) -> String {
    format!("{phase}.{direction}")
}

/// Scan is one execution of the pipeline against one repo, on behalf of one
/// account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Scan {
    pub id: Id,
    pub repo_id: Id,
    pub account_id: Id,
    pub status: ScanStatus,
    pub full: bool,
    #[cfg_attr(feature = "sqlx-support", sqlx(json))]
    pub phase_cursor: PhaseCursor,
    #[cfg_attr(feature = "sqlx-support", sqlx(json))]
    pub token_usage: TokenUsage,
    #[cfg_attr(feature = "sqlx-support", sqlx(json))]
    pub provider_identities: BTreeMap<String, String>,
    pub pr_count: Option<i64>,
    pub dupe_group_count: Option<i64>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_transitions_are_one_way() {
        let mut status = ScanStatus::Queued;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            assert!(!seen.contains(&next), "status {next:?} revisited");
            seen.push(next);
            status = next;
        }
        assert_eq!(status, ScanStatus::Done);
    }

    #[test]
    fn test_only_done_and_failed_are_terminal() {
        use ScanStatus::*;
        for status in [Queued, Ingesting, Embedding, Detecting, Verifying, Ranking] {
            assert!(!status.is_terminal());
        }
        assert!(Done.is_terminal());
        assert!(Failed.is_terminal());
    }
}
