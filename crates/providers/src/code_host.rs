use async_trait::async_trait;

use crate::error::CodeHostError;

/// PrSummary is the listing-level metadata the code host returns per PR,
/// before file paths or the diff have been fetched.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PrSummary {
    pub number: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub state: models::PrState,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DiffFetch is the result of fetching a PR's diff: the raw unified diff
/// text plus an etag the code host can use to answer future requests with
/// "not modified" rather than re-sending the body.
#[derive(Debug, Clone)]
pub struct DiffFetch {
    pub diff: String,
    pub etag: Option<String>,
}

/// CodeHostClient is the contract ingest uses to list and fetch PRs. A
/// concrete implementation (GitHub, GitLab, a hosted code-review tool's
/// native API, ...) lives outside this crate; only the interface is
/// defined here.
#[async_trait]
pub trait CodeHostClient: Send + Sync {
    async fn list_prs(
        &self,
        owner: &str,
        name: &str,
        max: Option<usize>,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<PrSummary>, CodeHostError>;

    async fn get_pr_files(
        &self,
        owner: &str,
        name: &str,
        number: i64,
    ) -> Result<Vec<String>, CodeHostError>;

    async fn get_pr_diff(
        &self,
        owner: &str,
        name: &str,
        number: i64,
        etag: Option<&str>,
    ) -> Result<DiffFetch, CodeHostError>;
}
