//! §4.5 Embedding: derives a code vector and an intent vector per PR and
//! upserts both into the vector store's `code` and `intent` collections.

use std::collections::HashMap;

use models::{Id, Pr};
use providers::{point_id, BatchOptions, EmbedRequest, SearchFilter, VectorPoint, VectorStore};
use resolver::EmbeddingHandle;

use crate::cursor::{self, CursorField, CursorWriter};
use crate::error::Result;
use crate::text::{file_paths_text, truncate_chars};

pub const CODE_COLLECTION: &str = "code";
pub const INTENT_COLLECTION: &str = "intent";

const BODY_CHAR_BUDGET: usize = 2_000;
const MAX_FILE_PATHS_SHOWN: usize = 200;

/// DEFAULT_BATCH_TOKEN_FRACTION is the portion of a provider's advertised
/// `max_input_tokens` a single request batch is allowed to consume.
const DEFAULT_BATCH_TOKEN_FRACTION: f64 = 0.9;

/// DEFAULT_BATCH_SUBMIT_TOKEN_CAP bounds a single async-batch submission to
/// comfortably clear a 3M-token provider-org ceiling.
const DEFAULT_BATCH_SUBMIT_TOKEN_CAP: usize = 2_800_000;

pub struct EmbedOutcome {
    /// re_embedded is the numbers of PRs whose vectors were (re)computed;
    /// everything else was a cache hit.
    pub re_embedded: Vec<i64>,
}

fn code_text(pr: &Pr) -> String {
    file_paths_text(&pr.file_paths, MAX_FILE_PATHS_SHOWN)
}

fn intent_text(pr: &Pr) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\n{}",
        pr.title,
        truncate_chars(&pr.body, BODY_CHAR_BUDGET),
        pr.intent_summary.as_deref().unwrap_or(""),
        file_paths_text(&pr.file_paths, MAX_FILE_PATHS_SHOWN),
    )
}

/// chunk_requests groups requests so the summed token count of each group
/// stays at or under `budget`. A single request whose own token count
/// exceeds `budget` still gets its own one-item group rather than being
/// dropped — the provider, not this function, is the authority on whether
/// it ultimately fits.
pub fn chunk_requests(
    requests: &[EmbedRequest],
    count_tokens: impl Fn(&str) -> usize,
    budget: usize,
) -> Vec<Vec<EmbedRequest>> {
    let mut chunks: Vec<Vec<EmbedRequest>> = Vec::new();
    let mut current: Vec<EmbedRequest> = Vec::new();
    let mut current_tokens = 0usize;

    for request in requests {
        let tokens = count_tokens(&request.text);
        if !current.is_empty() && current_tokens + tokens > budget {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current_tokens += tokens;
        current.push(request.clone());
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// needs_embedding is true when a PR's cache is stale, or its cache looks
/// fresh but one of its two vectors is actually missing from the vector
/// store (the `getVector` probe from §4.5).
async fn needs_embedding(vector_store: &dyn VectorStore, repo_id: Id, pr: &Pr) -> Result<bool> {
    if !pr.is_cache_fresh() {
        return Ok(true);
    }
    let code_id = point_id(repo_id, pr.number, "code");
    let intent_id = point_id(repo_id, pr.number, "intent");
    let code_present = vector_store.get_vector(CODE_COLLECTION, &code_id).await?.is_some();
    let intent_present = vector_store.get_vector(INTENT_COLLECTION, &intent_id).await?.is_some();
    Ok(!code_present || !intent_present)
}

pub async fn run(
    store: &store::Store,
    vector_store: &dyn VectorStore,
    embedding: &EmbeddingHandle,
    scan_id: Id,
    repo_id: Id,
    prs: &[Pr],
) -> Result<EmbedOutcome> {
    vector_store.ensure_collection(CODE_COLLECTION, embedding.as_provider().dimensions()).await?;
    vector_store.ensure_collection(INTENT_COLLECTION, embedding.as_provider().dimensions()).await?;

    let mut stale = Vec::new();
    for pr in prs {
        if needs_embedding(vector_store, repo_id, pr).await? {
            stale.push(pr);
        }
    }
    if stale.is_empty() {
        return Ok(EmbedOutcome { re_embedded: vec![] });
    }

    let code_requests: Vec<EmbedRequest> = stale
        .iter()
        .map(|pr| EmbedRequest {
            id: pr.number.to_string(),
            text: code_text(pr),
        })
        .collect();
    let intent_requests: Vec<EmbedRequest> = stale
        .iter()
        .map(|pr| EmbedRequest {
            id: pr.number.to_string(),
            text: intent_text(pr),
        })
        .collect();

    let (code_vectors, intent_vectors) = tokio::try_join!(
        embed_signal(store, embedding, scan_id, CursorField::Embed, &code_requests),
        embed_signal(store, embedding, scan_id, CursorField::EmbedIntent, &intent_requests),
    )?;

    let mut code_points = Vec::new();
    let mut intent_points = Vec::new();
    let mut re_embedded = Vec::new();

    for pr in &stale {
        let key = pr.number.to_string();
        let (Some(code_vec), Some(intent_vec)) = (code_vectors.get(&key), intent_vectors.get(&key)) else {
            continue;
        };
        code_points.push(VectorPoint {
            id: point_id(repo_id, pr.number, "code"),
            vector: code_vec.clone(),
            payload: HashMap::from([("repo_id".to_string(), serde_json::json!(repo_id)), ("pr_number".to_string(), serde_json::json!(pr.number))]),
        });
        intent_points.push(VectorPoint {
            id: point_id(repo_id, pr.number, "intent"),
            vector: intent_vec.clone(),
            payload: HashMap::from([("repo_id".to_string(), serde_json::json!(repo_id)), ("pr_number".to_string(), serde_json::json!(pr.number))]),
        });
        re_embedded.push(pr.number);
    }

    vector_store.upsert(CODE_COLLECTION, &code_points).await?;
    vector_store.upsert(INTENT_COLLECTION, &intent_points).await?;

    for pr in &stale {
        if re_embedded.contains(&pr.number) {
            store.update_pr_embed_hash(pr.id, pr.content_hash()).await?;
        }
    }

    Ok(EmbedOutcome { re_embedded })
}

/// embed_signal resolves one of the two parallel vector streams (code or
/// intent), dispatching through the batch path when the provider supports
/// it and falling back to sequential sync calls otherwise. Returns vectors
/// keyed by the request id (the PR number, as a string).
async fn embed_signal(
    store: &store::Store,
    embedding: &EmbeddingHandle,
    scan_id: Id,
    cursor_field: CursorField,
    requests: &[EmbedRequest],
) -> Result<HashMap<String, Vec<f32>>> {
    let provider = embedding.as_provider();
    let token_budget = (provider.max_input_tokens() as f64 * DEFAULT_BATCH_TOKEN_FRACTION) as usize;
    let request_chunks = chunk_requests(requests, |t| provider.count_tokens(t), token_budget);

    let mut out = HashMap::new();

    match embedding.as_batch() {
        Some(batch) => {
            let submit_chunks = chunk_requests(requests, |t| provider.count_tokens(t), DEFAULT_BATCH_SUBMIT_TOKEN_CAP);
            let existing = cursor::existing_batch_id(store, scan_id, cursor_field).await?;
            let mut existing = existing;
            for chunk in submit_chunks {
                let (writer, writer_handle) = CursorWriter::spawn(store.clone(), scan_id, cursor_field);
                let results = batch
                    .embed_batch(
                        &chunk,
                        BatchOptions {
                            existing_batch_id: existing.take(),
                            on_batch_created: Some(writer.callback()),
                        },
                    )
                    .await?;
                drop(writer);
                let _ = writer_handle.await;
                for result in results {
                    out.insert(result.id, result.vector);
                }
            }
        }
        None => {
            for chunk in request_chunks {
                let texts: Vec<String> = chunk.iter().map(|r| r.text.clone()).collect();
                let vectors = provider.embed(&texts).await?;
                for (request, vector) in chunk.iter().zip(vectors) {
                    out.insert(request.id.clone(), vector);
                }
            }
        }
    }

    Ok(out)
}

/// delete_repo_vectors removes every point belonging to `repo_id` from both
/// collections — used when a repo is deleted from the Store.
pub async fn delete_repo_vectors(vector_store: &dyn VectorStore, repo_id: Id) -> Result<()> {
    let filter = SearchFilter {
        must_equal: HashMap::from([("repo_id".to_string(), serde_json::json!(repo_id))]),
    };
    vector_store.delete_by_filter(CODE_COLLECTION, &filter).await?;
    vector_store.delete_by_filter(INTENT_COLLECTION, &filter).await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn request(id: &str, tokens: usize) -> EmbedRequest {
        EmbedRequest {
            id: id.to_string(),
            text: "x".repeat(tokens),
        }
    }

    #[test]
    fn test_chunk_requests_splits_when_budget_exceeded() {
        let requests = vec![request("1", 60), request("2", 60), request("3", 60)];
        let chunks = chunk_requests(&requests, |t| t.len(), 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 1);
        assert_eq!(chunks[1].len(), 2);
    }

    #[test]
    fn test_chunk_requests_keeps_oversized_request_alone() {
        let requests = vec![request("1", 500)];
        let chunks = chunk_requests(&requests, |t| t.len(), 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 1);
    }

    #[test]
    fn test_intent_text_includes_summary() {
        let pr = Pr {
            id: Id::new(1),
            repo_id: Id::new(1),
            number: 1,
            title: "Fix login timeout".into(),
            body: "body".into(),
            author: "alice".into(),
            state: models::PrState::Open,
            file_paths: vec!["a.rs".into()],
            diff_hash: Some("abc".into()),
            updated_at: chrono::Utc::now(),
            embed_hash: None,
            intent_summary: Some("Fixes a timeout bug.".into()),
        };
        assert!(intent_text(&pr).contains("Fixes a timeout bug."));
    }
}
