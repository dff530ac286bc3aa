//! In-memory fakes of every provider port, used by the phase runners' own
//! test suites (and by this crate's doctests) so scan-pipeline behavior can
//! be exercised without a real code host, embedding service, chat model, or
//! vector database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::chat::{ChatBatchProvider, ChatItemResult, ChatMessage, ChatProvider, ChatRequest, ChatResponse, Usage};
use crate::code_host::{CodeHostClient, DiffFetch, PrSummary};
use crate::embedding::{BatchOptions, EmbedRequest, EmbedResult, EmbeddingBatchProvider, EmbeddingProvider};
use crate::error::{ChatError, CodeHostError, EmbeddingError, VectorStoreError};
use crate::vector_store::{SearchFilter, SearchHit, VectorPoint, VectorStore};

/// FakeCodeHost serves a fixed, mutable listing of PRs and their diffs/files
/// out of memory. `diff_too_large` names PR numbers that answer
/// `get_pr_diff` with [`CodeHostError::DiffTooLarge`], exercising the
/// ingest phase's "continue on oversized diff" path.
#[derive(Default)]
pub struct FakeCodeHost {
    prs: Mutex<Vec<PrSummary>>,
    files: Mutex<HashMap<i64, Vec<String>>>,
    diffs: Mutex<HashMap<i64, String>>,
    diff_too_large: Mutex<Vec<i64>>,
}

impl FakeCodeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pr(self, summary: PrSummary, files: Vec<String>, diff: impl Into<String>) -> Self {
        let number = summary.number;
        self.prs.lock().unwrap().push(summary);
        self.files.lock().unwrap().insert(number, files);
        self.diffs.lock().unwrap().insert(number, diff.into());
        self
    }

    pub fn mark_diff_too_large(&self, number: i64) {
        self.diff_too_large.lock().unwrap().push(number);
    }

    pub fn set_prs(&self, prs: Vec<PrSummary>) {
        *self.prs.lock().unwrap() = prs;
    }
}

#[async_trait]
impl CodeHostClient for FakeCodeHost {
    async fn list_prs(
        &self,
        _owner: &str,
        _name: &str,
        max: Option<usize>,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<PrSummary>, CodeHostError> {
        let mut prs = self.prs.lock().unwrap().clone();
        if let Some(since) = since {
            prs.retain(|p| p.updated_at >= since);
        }
        if let Some(max) = max {
            prs.truncate(max);
        }
        Ok(prs)
    }

    async fn get_pr_files(&self, _owner: &str, _name: &str, number: i64) -> Result<Vec<String>, CodeHostError> {
        Ok(self.files.lock().unwrap().get(&number).cloned().unwrap_or_default())
    }

    async fn get_pr_diff(
        &self,
        _owner: &str,
        _name: &str,
        number: i64,
        _etag: Option<&str>,
    ) -> Result<DiffFetch, CodeHostError> {
        if self.diff_too_large.lock().unwrap().contains(&number) {
            return Err(CodeHostError::DiffTooLarge);
        }
        let diff = self.diffs.lock().unwrap().get(&number).cloned().unwrap_or_default();
        Ok(DiffFetch { diff, etag: None })
    }
}

/// FakeEmbeddingProvider derives a deterministic, low-dimensional vector
/// from each input text so that textually similar inputs land close in
/// cosine distance without pulling in a real embedding model. A handful of
/// overlapping-token-count features keep near-duplicate PR descriptions
/// genuinely close together, which is what the candidate-search tests rely
/// on.
pub struct FakeEmbeddingProvider {
    dims: usize,
    pub batch_calls: Mutex<Vec<String>>,
}

impl FakeEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            batch_calls: Mutex::new(Vec::new()),
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for token in text.split_whitespace() {
            let mut hasher_state: u64 = 1469598103934665603;
            for b in token.as_bytes() {
                hasher_state ^= *b as u64;
                hasher_state = hasher_state.wrapping_mul(1099511628211);
            }
            let slot = (hasher_state as usize) % self.dims;
            v[slot] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn max_input_tokens(&self) -> usize {
        8_000
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count().max(1)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

#[async_trait]
impl EmbeddingBatchProvider for FakeEmbeddingProvider {
    async fn embed_batch<'a>(
        &self,
        requests: &[EmbedRequest],
        mut options: BatchOptions<'a>,
    ) -> Result<Vec<EmbedResult>, EmbeddingError> {
        self.batch_calls
            .lock()
            .unwrap()
            .push(options.existing_batch_id.clone().unwrap_or_else(|| "new".to_string()));
        if let Some(cb) = options.on_batch_created.as_mut() {
            cb(format!("fake-embed-batch-{}", requests.len()));
        }
        Ok(requests
            .iter()
            .map(|r| EmbedResult {
                id: r.id.clone(),
                vector: self.vector_for(&r.text),
            })
            .collect())
    }
}

/// FakeChatProvider answers every `chat` call by invoking a caller-supplied
/// closure over the message text, so individual tests can script exactly
/// the JSON response (an intent summary, a pairwise verdict, a ranking)
/// they need without a real model in the loop.
pub struct FakeChatProvider<F> {
    responder: F,
    pub calls: Mutex<usize>,
}

impl<F> FakeChatProvider<F>
where
    F: Fn(&[ChatMessage]) -> serde_json::Value + Send + Sync,
{
    pub fn new(responder: F) -> Self {
        Self {
            responder,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl<F> ChatProvider for FakeChatProvider<F>
where
    F: Fn(&[ChatMessage]) -> serde_json::Value + Send + Sync,
{
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count().max(1)
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, ChatError> {
        *self.calls.lock().unwrap() += 1;
        Ok(ChatResponse {
            response: (self.responder)(messages),
            usage: Usage {
                input_tokens: messages.iter().map(|m| self.count_tokens(&m.content) as u64).sum(),
                output_tokens: 32,
            },
        })
    }
}

#[async_trait]
impl<F> ChatBatchProvider for FakeChatProvider<F>
where
    F: Fn(&[ChatMessage]) -> serde_json::Value + Send + Sync,
{
    async fn chat_batch<'a>(
        &self,
        requests: &[ChatRequest],
        mut options: BatchOptions<'a>,
    ) -> Result<Vec<ChatItemResult>, ChatError> {
        if let Some(cb) = options.on_batch_created.as_mut() {
            cb(format!("fake-chat-batch-{}", requests.len()));
        }
        let mut out = Vec::with_capacity(requests.len());
        for req in requests {
            let resp = self.chat(&req.messages).await?;
            out.push(ChatItemResult {
                id: req.id.clone(),
                result: Ok(resp),
            });
        }
        Ok(out)
    }
}

/// InMemoryVectorStore is a brute-force vector store: collections are
/// `HashMap<id, VectorPoint>`, and `search` does a linear cosine-similarity
/// scan. Fine for the data sizes in tests; nowhere close to what a real
/// deployment would use.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: Mutex<HashMap<String, HashMap<String, VectorPoint>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn matches_filter(point: &VectorPoint, filter: &SearchFilter) -> bool {
    filter
        .must_equal
        .iter()
        .all(|(k, v)| point.payload.get(k) == Some(v))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, name: &str, _dim: usize) -> Result<(), VectorStoreError> {
        self.collections.lock().unwrap().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, name: &str, points: &[VectorPoint]) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.lock().unwrap();
        let collection = collections.entry(name.to_string()).or_default();
        for point in points {
            collection.insert(point.id.clone(), point.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>, VectorStoreError> {
        let collections = self.collections.lock().unwrap();
        let Some(collection) = collections.get(name) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<SearchHit> = collection
            .values()
            .filter(|p| matches_filter(p, filter))
            .map(|p| SearchHit {
                id: p.id.clone(),
                score: cosine(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_vector(&self, name: &str, id: &str) -> Result<Option<Vec<f32>>, VectorStoreError> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(name)
            .and_then(|c| c.get(id))
            .map(|p| p.vector.clone()))
    }

    async fn delete_by_filter(&self, name: &str, filter: &SearchFilter) -> Result<(), VectorStoreError> {
        if let Some(collection) = self.collections.lock().unwrap().get_mut(name) {
            collection.retain(|_, p| !matches_filter(p, filter));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_vector_store_search_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.ensure_collection("intent", 3).await.unwrap();
        store
            .upsert(
                "intent",
                &[
                    VectorPoint {
                        id: "a".into(),
                        vector: vec![1.0, 0.0, 0.0],
                        payload: HashMap::new(),
                    },
                    VectorPoint {
                        id: "b".into(),
                        vector: vec![0.0, 1.0, 0.0],
                        payload: HashMap::new(),
                    },
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search("intent", &[0.9, 0.1, 0.0], 2, &SearchFilter::default())
            .await
            .unwrap();
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn test_fake_embedding_is_deterministic() {
        let provider = FakeEmbeddingProvider::new(16);
        let a = provider.embed(&["fix login timeout".to_string()]).await.unwrap();
        let b = provider.embed(&["fix login timeout".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }
}
