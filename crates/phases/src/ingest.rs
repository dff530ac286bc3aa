//! §4.3 Ingest: lists PRs from the code host, fetches files and diffs for
//! anything new or changed, and upserts the result into the Store. Produces
//! the consistent PR-number snapshot the rest of the pipeline operates on.

use chrono::{DateTime, Utc};
use providers::error::CodeHostError;
use providers::CodeHostClient;

use crate::error::{PhaseError, Result};

/// IngestInput is everything a single ingest invocation needs. `full`
/// selects between a complete open-PR listing (which also reconciles
/// closures) and an incremental `since last_scan_at` listing (which does
/// not — §4.3 step 4, locked in by the warm-ingest test in §8/S5).
pub struct IngestInput<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub max_prs: Option<usize>,
    pub full: bool,
    pub last_scan_at: Option<DateTime<Utc>>,
}

pub struct IngestOutcome {
    /// pr_numbers is this scan's snapshot: the PRs just observed, in the
    /// order the code host returned them. Downstream phases operate on
    /// exactly this set, not "every open PR in the repo".
    pub pr_numbers: Vec<i64>,
}

pub async fn run(
    store: &store::Store,
    code_host: &dyn CodeHostClient,
    repo_id: models::Id,
    input: IngestInput<'_>,
) -> Result<IngestOutcome> {
    let since = if input.full { None } else { input.last_scan_at };

    let summaries = code_host
        .list_prs(input.owner, input.name, input.max_prs, since)
        .await?;

    let mut pr_numbers = Vec::with_capacity(summaries.len());

    for summary in &summaries {
        pr_numbers.push(summary.number);

        if let Some(existing) = store.get_pr(repo_id, summary.number).await? {
            if existing.updated_at == summary.updated_at {
                continue;
            }
        }

        let (file_paths, diff_hash) = fetch_files_and_diff_hash(code_host, input.owner, input.name, summary.number).await?;

        store
            .upsert_pr(&models::PrUpsert {
                repo_id,
                number: summary.number,
                title: summary.title.clone(),
                body: summary.body.clone(),
                author: summary.author.clone(),
                state: summary.state,
                file_paths,
                diff_hash,
                updated_at: summary.updated_at,
            })
            .await?;
    }

    if input.full {
        store.mark_stale_prs_closed(repo_id, &pr_numbers).await?;
    }

    Ok(IngestOutcome { pr_numbers })
}

/// fetch_files_and_diff_hash fetches a PR's file list unconditionally, and
/// its diff only to derive `diff_hash` — a "diff too large" response is
/// recorded as `diff_hash = None` rather than failing the phase (§4.3 step
/// 3 / §7's "content too large" policy).
async fn fetch_files_and_diff_hash(
    code_host: &dyn CodeHostClient,
    owner: &str,
    name: &str,
    number: i64,
) -> Result<(Vec<String>, Option<String>)> {
    let files = code_host.get_pr_files(owner, name, number).await?;

    let diff_hash = match code_host.get_pr_diff(owner, name, number, None).await {
        Ok(fetch) => Some(models::diff_hash(&fetch.diff)),
        Err(CodeHostError::DiffTooLarge) => None,
        Err(err) => return Err(PhaseError::from(err)),
    };

    Ok((files, diff_hash))
}

#[cfg(test)]
mod test {
    use super::*;
    use providers::testing::FakeCodeHost;
    use providers::PrSummary;

    fn summary(number: i64, title: &str, updated_at: DateTime<Utc>) -> PrSummary {
        PrSummary {
            number,
            title: title.into(),
            body: "body".into(),
            author: "alice".into(),
            state: models::PrState::Open,
            updated_at,
        }
    }

    #[tokio::test]
    async fn test_diff_too_large_yields_null_hash_not_error() {
        let host = FakeCodeHost::new().with_pr(
            summary(1, "Fix login timeout", Utc::now()),
            vec!["a.rs".into()],
            "@@ -1,2 +1,2 @@\n-old\n+new\n",
        );
        host.mark_diff_too_large(1);

        let (files, diff_hash) = fetch_files_and_diff_hash(&host, "o", "r", 1).await.unwrap();
        assert_eq!(files, vec!["a.rs".to_string()]);
        assert_eq!(diff_hash, None);
    }

    #[tokio::test]
    async fn test_ordinary_diff_yields_a_hash() {
        let host = FakeCodeHost::new().with_pr(
            summary(1, "Fix login timeout", Utc::now()),
            vec!["a.rs".into()],
            "@@ -1,2 +1,2 @@\n-old\n+new\n",
        );

        let (_files, diff_hash) = fetch_files_and_diff_hash(&host, "o", "r", 1).await.unwrap();
        assert!(diff_hash.is_some());
    }
}
