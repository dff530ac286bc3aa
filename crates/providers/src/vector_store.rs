use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::VectorStoreError;

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// must_equal restricts results to points whose payload matches every
    /// given key/value pair, e.g. `{"repo_id": "..."}` to scope a search to
    /// one repo.
    pub must_equal: HashMap<String, serde_json::Value>,
}

/// VectorStore is the contract for the two named collections (`code` and
/// `intent`) the embedding phase populates and the candidate-search phase
/// queries. Point ids are the stable string `"{repo_id}-{pr_number}-{code|intent}"`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn ensure_collection(&self, name: &str, dim: usize) -> Result<(), VectorStoreError>;

    async fn upsert(&self, name: &str, points: &[VectorPoint]) -> Result<(), VectorStoreError>;

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>, VectorStoreError>;

    async fn get_vector(&self, name: &str, id: &str) -> Result<Option<Vec<f32>>, VectorStoreError>;

    async fn delete_by_filter(&self, name: &str, filter: &SearchFilter) -> Result<(), VectorStoreError>;
}

pub fn point_id(repo_id: models::Id, pr_number: i64, signal: &str) -> String {
    format!("{repo_id}-{pr_number}-{signal}")
}
