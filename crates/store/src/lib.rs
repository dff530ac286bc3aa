//! Store is the durable record keeper for accounts, repos, PRs, scans,
//! dupe groups, and the pairwise verdict cache. It wraps a single
//! `sqlx::PgPool`; every multi-row update (mark-stale, upsert-PR,
//! insert-group-with-members, clear-cache) runs inside one transaction.

mod accounts;
mod error;
mod groups;
mod pairwise;
mod prs;
mod repos;
mod scans;

pub use error::{Error, Result};
pub use pairwise::PairLookup;
pub use scans::ScanStatusUpdate;

use std::sync::{LazyLock, Mutex};

/// Store owns the database connection. A scan exclusively references one
/// repo and one account but doesn't own them; jobs exclusively reference a
/// scan; cache entries are owned by the repo (cascaded on delete).
#[derive(Clone)]
pub struct Store {
    pool: sqlx::PgPool,
}

impl Store {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// migrate runs every pending migration in `migrations/`. Idempotent —
    /// safe to call on every process start.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

/// next_id mints a process-unique [`models::Id`] for newly created rows.
/// Shared across every table so ids remain k-sortable across the whole
/// store, mirroring the single global generator pattern used by the job
/// queue.
pub fn next_id() -> models::Id {
    static GENERATOR: LazyLock<Mutex<models::IdGenerator>> =
        LazyLock::new(|| Mutex::new(models::IdGenerator::new(1)));

    let now_millis = chrono::Utc::now().timestamp_millis();
    GENERATOR.lock().unwrap().next(now_millis)
}
