//! The worker pool: the process that actually drives scans forward. It
//! polls [`queue::JobQueue`] for runnable `scan`/`ingest`/`detect` jobs,
//! dispatches each to its `orchestrator` handler on a bounded pool of
//! concurrent tasks, and reports the outcome back to the queue —
//! `complete` on success, `fail` (which schedules the queue's own backoff
//! retry) otherwise. A scan pipeline has no interactive/background split
//! the way the control plane's job tables do, so a single jittered poll
//! interval is enough; there's no LISTEN/NOTIFY wakeup to wire up.

mod error;

pub use error::{Error, Result};

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use models::{Job, JobType};

const JOB_TYPES: [JobType; 3] = [JobType::SCAN, JobType::INGEST, JobType::DETECT];

/// Config bounds the pool's behavior: how many jobs may run concurrently,
/// and how long to sleep between polls when nothing was runnable.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub concurrency: usize,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 8,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// jittered scales `base` by a random factor in `[0.9, 1.1)` so that many
/// worker processes polling the same queue don't all wake in lockstep.
fn jittered(base: Duration) -> Duration {
    let factor = 0.9 + rand::random::<f64>() * 0.2;
    base.mul_f64(factor)
}

/// serve runs the poll-dispatch-report loop until `shutdown` resolves.
/// Jobs already claimed and running are left to finish; `shutdown` only
/// stops new jobs from being claimed, and `serve` doesn't return until
/// every in-flight job has reported back to the queue.
pub async fn serve(
    store: store::Store,
    queue: queue::JobQueue,
    resolver: Arc<resolver::ServiceResolver>,
    config: Config,
    shutdown: impl std::future::Future<Output = ()>,
) {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(config.concurrency));
    tokio::pin!(shutdown);

    loop {
        if (&mut shutdown).now_or_never().is_some() {
            break;
        }

        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tokio::select! {
                    () = &mut shutdown => break,
                    _ = tokio::time::sleep(jittered(config.poll_interval)) => continue,
                }
            }
        };

        let job = match queue.dequeue(&JOB_TYPES).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                drop(permit);
                tokio::select! {
                    () = &mut shutdown => break,
                    _ = tokio::time::sleep(jittered(config.poll_interval)) => continue,
                }
            }
            Err(err) => {
                drop(permit);
                tracing::error!(error = %err, "failed to poll job queue (will retry)");
                tokio::select! {
                    () = &mut shutdown => break,
                    _ = tokio::time::sleep(jittered(config.poll_interval)) => continue,
                }
            }
        };

        let store = store.clone();
        let queue = queue.clone();
        let resolver = resolver.clone();

        tokio::spawn(async move {
            let _permit = permit;
            run_job(&store, &queue, &resolver, job).await;
        });
    }

    tracing::info!("worker pool signaled to stop, awaiting in-flight jobs");
    queue.pause();
    let _ = semaphore.acquire_many_owned(config.concurrency as u32).await;
}

/// run_job dispatches one claimed job and reports its outcome back to the
/// queue. It never propagates an error: a failure to `complete`/`fail` is
/// logged, since there's no caller left to hand it to — the job will
/// simply be picked up again once its row's `updated_at` falls outside
/// [`queue::JobQueue::reap_stuck_jobs`]'s timeout.
async fn run_job(store: &store::Store, queue: &queue::JobQueue, resolver: &resolver::ServiceResolver, job: Job) {
    let job_id = job.id;
    let job_type = job.job_type;

    match dispatch(store, queue, resolver, job).await {
        Ok(()) => {
            if let Err(err) = queue.complete(job_id).await {
                tracing::error!(?job_id, error = %err, "failed to mark job complete");
            }
        }
        Err(err) => {
            tracing::warn!(?job_id, ?job_type, error = %err, "job failed");
            if let Err(err) = queue.fail(job_id, &err.to_string()).await {
                tracing::error!(?job_id, error = %err, "failed to record job failure");
            }
        }
    }
}

/// dispatch routes a claimed job to its orchestrator handler by job type.
/// `JOB_TYPES` is exactly the filter `dequeue` was called with, so the
/// fallback arm is unreachable in practice; it exists so adding a new
/// `JobType` without adding its dispatch arm is a loud runtime error
/// instead of a silently stuck job.
async fn dispatch(store: &store::Store, queue: &queue::JobQueue, resolver: &resolver::ServiceResolver, job: Job) -> Result<()> {
    match job.job_type {
        JobType::SCAN => {
            let payload: models::ScanJobPayload = serde_json::from_value(job.payload)?;
            orchestrator::run_scan_job(store, queue, payload).await?;
        }
        JobType::INGEST => {
            let payload: models::IngestJobPayload = serde_json::from_value(job.payload)?;
            orchestrator::run_ingest_job(store, queue, resolver, payload).await?;
        }
        JobType::DETECT => {
            let payload: models::DetectJobPayload = serde_json::from_value(job.payload)?;
            orchestrator::run_detect_job(store, resolver, payload).await?;
        }
        other => return Err(Error::UnknownJobType(other)),
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_jittered_stays_within_ten_percent() {
        let base = Duration::from_secs(10);
        for _ in 0..100 {
            let got = jittered(base);
            assert!(got >= base.mul_f64(0.9));
            assert!(got < base.mul_f64(1.1));
        }
    }

    #[test]
    fn test_job_types_cover_every_orchestrator_handler() {
        assert_eq!(JOB_TYPES, [JobType::SCAN, JobType::INGEST, JobType::DETECT]);
    }
}
