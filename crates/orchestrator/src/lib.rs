//! The Orchestrator: the scan state machine. It creates scan rows,
//! enforces one active scan per (repo, account), sequences the phase
//! handlers in the order §4.10 prescribes, persists the externally-visible
//! status transition between each phase, and resolves every phase failure
//! into either a queue retry or a terminal `failed` scan.
//!
//! The ingest phase runs as its own job; intent extraction, embedding,
//! candidate search, pairwise verification, clique grouping, and ranking
//! all run inline within the single `detect` job that follows — one of the
//! two valid shapes §4.10 allows, chosen here because it keeps the phase
//! cursor (and thus restart-resume) scoped to one job's lifetime per scan
//! stage instead of five.

mod error;

pub use error::{Error, Result};

use std::collections::HashMap;

use models::{Id, Pr, ScanStatus};
use phases::{clique, detect, embed, ingest, intent, rank, verify, PhaseError};
use store::ScanStatusUpdate;

/// is_stale_dispatch is true when a job's expected starting status no
/// longer matches the scan's actual status — meaning some earlier delivery
/// of this same job already ran it to completion (or past it) and this
/// delivery is a harmless redelivery under at-least-once semantics.
fn is_stale_dispatch(actual: ScanStatus, expected: ScanStatus) -> bool {
    actual != expected
}

/// The statuses a `detect` job is allowed to (re-)run under. Unlike
/// `scan`/`ingest`, a single `detect` job's handler advances the scan
/// through several statuses (`Embedding` through `Ranking`) itself, so a
/// retried delivery after a transient failure midway through verification
/// or ranking arrives with the scan already past `Embedding`. Gating on
/// one exact expected status would read that as stale and no-op it,
/// leaving the scan wedged short of `Done`/`Failed` forever. Every phase
/// `run_detect_job` runs is itself idempotent (cache-fresh intent/embed
/// steps self-skip; verify/rank overwrite rather than append), so it's
/// safe to re-enter at any of these statuses and let the phases replay.
const DETECT_REENTRANT_STATUSES: [ScanStatus; 4] = [ScanStatus::Embedding, ScanStatus::Detecting, ScanStatus::Verifying, ScanStatus::Ranking];

fn is_stale_detect_dispatch(actual: ScanStatus) -> bool {
    !DETECT_REENTRANT_STATUSES.contains(&actual)
}

/// start_scan creates (or finds) the active scan for `(repo_id,
/// account_id)` and enqueues its `scan` job. Enqueueing unconditionally is
/// safe even when an existing non-terminal scan was returned instead of a
/// fresh one: [`run_scan_job`] is idempotent and no-ops on any scan that
/// isn't still `queued`.
pub async fn start_scan(
    store: &store::Store,
    queue: &queue::JobQueue,
    repo_id: Id,
    account_id: Id,
    full: bool,
    max_prs: Option<i64>,
) -> Result<Id> {
    let scan = store.create_scan(repo_id, account_id, full).await?;
    queue
        .enqueue(
            scan.id,
            models::JobType::SCAN,
            &models::ScanJobPayload {
                scan_id: scan.id,
                repo_id,
                account_id,
                full,
                max_prs,
            },
            3,
        )
        .await?;
    Ok(scan.id)
}

/// run_scan_job is the handler for a `scan` job: it flips the scan to
/// `ingesting` and enqueues the `ingest` job carrying the repo's
/// incremental watermark.
pub async fn run_scan_job(store: &store::Store, queue: &queue::JobQueue, payload: models::ScanJobPayload) -> Result<()> {
    let scan = store.get_scan(payload.scan_id).await?.ok_or(Error::ScanNotFound(payload.scan_id))?;
    if is_stale_dispatch(scan.status, ScanStatus::Queued) {
        return Ok(());
    }

    let repo = store.get_repo(payload.repo_id).await?.ok_or(Error::RepoNotFound(payload.repo_id))?;

    store
        .set_scan_status(payload.scan_id, ScanStatus::Ingesting, ScanStatusUpdate::default())
        .await?;

    let last_scan_at = if payload.full { None } else { repo.last_scan_at };

    queue
        .enqueue(
            payload.scan_id,
            models::JobType::INGEST,
            &models::IngestJobPayload {
                scan_id: payload.scan_id,
                repo_id: payload.repo_id,
                account_id: payload.account_id,
                full: payload.full,
                max_prs: payload.max_prs,
                last_scan_at,
            },
            3,
        )
        .await?;

    Ok(())
}

/// run_ingest_job is the handler for an `ingest` job: it runs §4.3 against
/// the account's code-host provider and, on success, advances the scan to
/// `embedding` and enqueues the `detect` job with this scan's PR snapshot.
pub async fn run_ingest_job(
    store: &store::Store,
    queue: &queue::JobQueue,
    resolver: &resolver::ServiceResolver,
    payload: models::IngestJobPayload,
) -> Result<()> {
    let scan = store.get_scan(payload.scan_id).await?.ok_or(Error::ScanNotFound(payload.scan_id))?;
    if is_stale_dispatch(scan.status, ScanStatus::Ingesting) {
        return Ok(());
    }

    let repo = store.get_repo(payload.repo_id).await?.ok_or(Error::RepoNotFound(payload.repo_id))?;
    let providers = resolver.resolve(payload.account_id).await?;

    let outcome = match ingest::run(
        store,
        providers.code_host.as_ref(),
        payload.repo_id,
        ingest::IngestInput {
            owner: &repo.owner,
            name: &repo.name,
            max_prs: payload.max_prs.map(|n| n as usize),
            full: payload.full,
            last_scan_at: payload.last_scan_at,
        },
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => return resolve_phase_failure(store, payload.scan_id, err).await,
    };

    store
        .set_scan_status(payload.scan_id, ScanStatus::Embedding, ScanStatusUpdate::default())
        .await?;

    queue
        .enqueue(
            payload.scan_id,
            models::JobType::DETECT,
            &models::DetectJobPayload {
                scan_id: payload.scan_id,
                repo_id: payload.repo_id,
                account_id: payload.account_id,
                pr_numbers: outcome.pr_numbers,
            },
            3,
        )
        .await?;

    Ok(())
}

/// run_detect_job is the handler for a `detect` job: it runs every
/// remaining phase (intent, embed, candidate search, verify, clique
/// grouping, rank) inline against this scan's PR snapshot, advancing
/// `scans.status` visibly between each one, and finishes by marking the
/// scan `done` and stamping the repo's `last_scan_at`. A retried delivery
/// (after a transient failure partway through) re-enters at whatever
/// status the previous attempt reached rather than expecting to still be
/// at `Embedding`; see [`is_stale_detect_dispatch`].
pub async fn run_detect_job(
    store: &store::Store,
    resolver: &resolver::ServiceResolver,
    payload: models::DetectJobPayload,
) -> Result<()> {
    let scan = store.get_scan(payload.scan_id).await?.ok_or(Error::ScanNotFound(payload.scan_id))?;
    if is_stale_detect_dispatch(scan.status) {
        return Ok(());
    }

    let providers = resolver.resolve(payload.account_id).await?;

    let prs = store.list_prs_by_numbers(payload.repo_id, &payload.pr_numbers).await?;

    if let Err(err) = intent::run(store, &providers.chat, payload.scan_id, &prs).await {
        return resolve_phase_failure(store, payload.scan_id, err).await;
    }
    // intent::run stamps `intent_summary`; re-read so embed/verify/rank see it.
    let prs = store.list_prs_by_numbers(payload.repo_id, &payload.pr_numbers).await?;

    if let Err(err) = embed::run(
        store,
        providers.vector_store.as_ref(),
        &providers.embedding,
        payload.scan_id,
        payload.repo_id,
        &prs,
    )
    .await
    {
        return resolve_phase_failure(store, payload.scan_id, err).await;
    }
    // embed::run stamps `embed_hash`; re-read so candidate search sees fresh cache state.
    let prs = store.list_prs_by_numbers(payload.repo_id, &payload.pr_numbers).await?;

    store
        .set_scan_status(payload.scan_id, ScanStatus::Detecting, ScanStatusUpdate::default())
        .await?;

    let candidates = match detect::run(providers.vector_store.as_ref(), payload.repo_id, &prs, detect::CandidateSearchInput::default()).await {
        Ok(candidates) => candidates,
        Err(err) => return resolve_phase_failure(store, payload.scan_id, err).await,
    };

    store
        .set_scan_status(payload.scan_id, ScanStatus::Verifying, ScanStatusUpdate::default())
        .await?;

    let prs_by_number: HashMap<i64, Pr> = prs.iter().map(|pr| (pr.number, pr.clone())).collect();

    let verify_outcome = match verify::run(store, &providers.chat, payload.repo_id, payload.scan_id, &prs_by_number, &candidates).await {
        Ok(outcome) => outcome,
        Err(err) => return resolve_phase_failure(store, payload.scan_id, err).await,
    };

    let cliques = clique::build(&verify_outcome.verdicts);

    store
        .set_scan_status(payload.scan_id, ScanStatus::Ranking, ScanStatusUpdate::default())
        .await?;

    if let Err(err) = rank::run(store, &providers.chat, payload.scan_id, &verify_outcome.verdicts, &prs_by_number, &cliques).await {
        return resolve_phase_failure(store, payload.scan_id, err).await;
    }

    store
        .set_scan_status(
            payload.scan_id,
            ScanStatus::Done,
            ScanStatusUpdate {
                completed_at: Some(chrono::Utc::now()),
                pr_count: Some(prs.len() as i64),
                dupe_group_count: Some(cliques.len() as i64),
                ..Default::default()
            },
        )
        .await?;

    store.set_last_scan_at(payload.repo_id, chrono::Utc::now()).await?;

    Ok(())
}

/// resolve_phase_failure applies §7's error taxonomy: a retryable
/// ([`PhaseError::is_retryable`]) error is propagated so the caller's
/// queue handler schedules a backoff retry and the scan is left exactly as
/// it was; anything else fails the scan outright and reports the job as
/// handled (no further retry — retrying an invariant violation or an
/// exhausted quota won't fix it).
async fn resolve_phase_failure(store: &store::Store, scan_id: Id, err: PhaseError) -> Result<()> {
    if err.is_retryable() {
        tracing::warn!(scan = %scan_id, error = %err, "transient phase error, retrying via queue backoff");
        return Err(err.into());
    }

    tracing::error!(scan = %scan_id, error = %err, "phase failed scan permanently");
    store
        .set_scan_status(
            scan_id,
            ScanStatus::Failed,
            ScanStatusUpdate {
                error: Some(err.to_string()),
                ..Default::default()
            },
        )
        .await?;
    store.clear_scan_cursor(scan_id).await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_matching_status_is_not_a_stale_dispatch() {
        assert!(!is_stale_dispatch(ScanStatus::Ingesting, ScanStatus::Ingesting));
    }

    #[test]
    fn test_mismatched_status_is_a_stale_dispatch() {
        assert!(is_stale_dispatch(ScanStatus::Embedding, ScanStatus::Ingesting));
    }

    #[test]
    fn test_detect_dispatch_admits_every_post_ingest_non_terminal_status() {
        for status in [ScanStatus::Embedding, ScanStatus::Detecting, ScanStatus::Verifying, ScanStatus::Ranking] {
            assert!(!is_stale_detect_dispatch(status), "{status:?} should be a valid detect re-entry point");
        }
    }

    #[test]
    fn test_detect_dispatch_rejects_pre_ingest_and_terminal_status() {
        for status in [ScanStatus::Queued, ScanStatus::Ingesting, ScanStatus::Done, ScanStatus::Failed] {
            assert!(is_stale_detect_dispatch(status), "{status:?} should be rejected as stale");
        }
    }
}
