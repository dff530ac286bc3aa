//! JobQueue is a durable, at-least-once FIFO layered directly on the
//! `jobs` table. It claims work with `FOR UPDATE SKIP LOCKED` so that
//! concurrent workers never race onto the same row, the same pattern the
//! pipeline's worker pool borrows for its own heartbeat sweep.

mod backoff;

pub use backoff::backoff;

use models::{Id, Job, JobStatus, JobType};
use sqlx::types::Json as SqlJson;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error")]
    Db(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

const JOB_COLUMNS: &str = r#"
    id, scan_id, job_type, payload, status, attempts, max_retries, run_after, last_error,
    created_at, updated_at
"#;

#[derive(Clone)]
pub struct JobQueue {
    pool: sqlx::PgPool,
    paused: Arc<AtomicBool>,
}

impl JobQueue {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            pool,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// enqueue inserts a new job in `Queued` status, runnable immediately.
    pub async fn enqueue<P: serde::Serialize>(
        &self,
        scan_id: Id,
        job_type: JobType,
        payload: &P,
        max_retries: i32,
    ) -> Result<Id> {
        let id = next_id();
        sqlx::query(
            r#"
            insert into jobs (id, scan_id, job_type, payload, status, max_retries)
            values ($1, $2, $3, $4, 'queued', $5)
            "#,
        )
        .bind(id)
        .bind(scan_id)
        .bind(job_type)
        .bind(SqlJson(payload))
        .bind(max_retries)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// dequeue claims exactly one runnable job of the given types,
    /// transitioning it from `Queued` to `Running`, or `None` if nothing
    /// is ready. `pause()` makes this always return `None` without
    /// touching the database, so a shutting-down worker stops picking up
    /// new work while letting already-running jobs finish.
    pub async fn dequeue(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        if self.paused.load(Ordering::Acquire) {
            return Ok(None);
        }

        let type_ints: Vec<i16> = job_types.iter().map(|t| t.0).collect();

        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            with picked as (
                select id from jobs
                where job_type = any($1) and status = 'queued' and run_after < now()
                order by created_at asc
                limit 1
                for update skip locked
            )
            update jobs set status = 'running', updated_at = now()
            where id in (select id from picked)
            returning {JOB_COLUMNS}
            "#
        ))
        .bind(&type_ints)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// complete marks a job `Done`. Idempotent: completing an already-done
    /// job is a harmless no-op, which matters because a worker that
    /// crashes after committing side effects but before this call will
    /// have the job redelivered and re-completed.
    pub async fn complete(&self, id: Id) -> Result<()> {
        sqlx::query("update jobs set status = 'done', updated_at = now() where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// fail increments the attempt counter and either schedules a backoff
    /// retry (`attempts < max_retries`) or marks the job permanently
    /// `Failed`. Each retry gets a freshly computed `run_after`, so
    /// distinct attempts are never coalesced onto the same wake time.
    pub async fn fail(&self, id: Id, error: &str) -> Result<JobStatus> {
        let row: (i32, i32) =
            sqlx::query_as("select attempts, max_retries from jobs where id = $1 for update")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        let (attempts, max_retries) = row;
        let next_attempts = attempts + 1;

        let next_status = if next_attempts < max_retries {
            JobStatus::Queued
        } else {
            JobStatus::Failed
        };

        let run_after = if next_status == JobStatus::Queued {
            chrono::Utc::now() + chrono::Duration::from_std(backoff(next_attempts as u32)).unwrap()
        } else {
            chrono::Utc::now()
        };

        sqlx::query(
            r#"
            update jobs set
                status = $2, attempts = $3, run_after = $4, last_error = $5, updated_at = now()
            where id = $1
            "#,
        )
        .bind(id)
        .bind(next_status)
        .bind(next_attempts)
        .bind(run_after)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(next_status)
    }

    /// pause stops future `dequeue` calls from claiming new work. Already
    /// `Running` jobs are left to finish; callers typically await those
    /// via their own join handles before exiting.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub async fn get_status(&self, id: Id) -> Result<Option<JobStatus>> {
        let row: Option<(JobStatus,)> = sqlx::query_as("select status from jobs where id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(s,)| s))
    }

    pub async fn get_job(&self, id: Id) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, Job>(&format!("select {JOB_COLUMNS} from jobs where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// reap_stuck_jobs is the optional liveness sweep: a `Running` job
    /// whose worker died is returned to `Queued` once it's been running
    /// longer than `timeout`, so restart never silently drops in-flight
    /// work. It doesn't increment `attempts` — the job wasn't actually
    /// attempted and failed, it was orphaned.
    pub async fn reap_stuck_jobs(&self, timeout: chrono::Duration) -> Result<u64> {
        let cutoff = chrono::Utc::now() - timeout;
        let result = sqlx::query(
            r#"
            update jobs set status = 'queued', run_after = now(), updated_at = now()
            where status = 'running' and updated_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn next_id() -> Id {
    use std::sync::{LazyLock, Mutex};
    static GENERATOR: LazyLock<Mutex<models::IdGenerator>> =
        LazyLock::new(|| Mutex::new(models::IdGenerator::new(2)));
    let now_millis = chrono::Utc::now().timestamp_millis();
    GENERATOR.lock().unwrap().next(now_millis)
}
