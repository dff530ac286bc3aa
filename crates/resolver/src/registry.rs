use std::collections::HashMap;
use std::sync::Arc;

use providers::{CodeHostClient, VectorStore};

use crate::{ChatHandle, EmbeddingHandle, Error, Result};

pub type CodeHostFactory = Box<dyn Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn CodeHostClient>> + Send + Sync>;
pub type EmbeddingFactory = Box<dyn Fn(&serde_json::Value) -> anyhow::Result<EmbeddingHandle> + Send + Sync>;
pub type ChatFactory = Box<dyn Fn(&serde_json::Value) -> anyhow::Result<ChatHandle> + Send + Sync>;
pub type VectorStoreFactory = Box<dyn Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn VectorStore>> + Send + Sync>;

/// ProviderRegistry maps the opaque `provider` name carried in an account's
/// [`models::ProviderConfig`] (e.g. `"github"`, `"openai-embeddings"`,
/// `"qdrant"`) to a constructor for that concrete implementation. The
/// engine ships no concrete providers itself — callers (the binary wiring
/// this crate together) register the ones they actually support.
#[derive(Default)]
pub struct ProviderRegistry {
    code_hosts: HashMap<String, CodeHostFactory>,
    embeddings: HashMap<String, EmbeddingFactory>,
    chats: HashMap<String, ChatFactory>,
    vector_stores: HashMap<String, VectorStoreFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code_host(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn CodeHostClient>> + Send + Sync + 'static,
    ) -> Self {
        self.code_hosts.insert(name.into(), Box::new(factory));
        self
    }

    pub fn with_embedding(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&serde_json::Value) -> anyhow::Result<EmbeddingHandle> + Send + Sync + 'static,
    ) -> Self {
        self.embeddings.insert(name.into(), Box::new(factory));
        self
    }

    pub fn with_chat(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&serde_json::Value) -> anyhow::Result<ChatHandle> + Send + Sync + 'static,
    ) -> Self {
        self.chats.insert(name.into(), Box::new(factory));
        self
    }

    pub fn with_vector_store(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&serde_json::Value) -> anyhow::Result<Arc<dyn VectorStore>> + Send + Sync + 'static,
    ) -> Self {
        self.vector_stores.insert(name.into(), Box::new(factory));
        self
    }

    pub(crate) fn build_code_host(&self, name: &str, settings: &serde_json::Value) -> Result<Arc<dyn CodeHostClient>> {
        let factory = self
            .code_hosts
            .get(name)
            .ok_or_else(|| Error::UnknownProvider(models::ProviderKind::CodeHost, name.to_string()))?;
        Ok(factory(settings)?)
    }

    pub(crate) fn build_embedding(&self, name: &str, settings: &serde_json::Value) -> Result<EmbeddingHandle> {
        let factory = self
            .embeddings
            .get(name)
            .ok_or_else(|| Error::UnknownProvider(models::ProviderKind::Embedding, name.to_string()))?;
        Ok(factory(settings)?)
    }

    pub(crate) fn build_chat(&self, name: &str, settings: &serde_json::Value) -> Result<ChatHandle> {
        let factory = self
            .chats
            .get(name)
            .ok_or_else(|| Error::UnknownProvider(models::ProviderKind::Chat, name.to_string()))?;
        Ok(factory(settings)?)
    }

    pub(crate) fn build_vector_store(&self, name: &str, settings: &serde_json::Value) -> Result<Arc<dyn VectorStore>> {
        let factory = self
            .vector_stores
            .get(name)
            .ok_or_else(|| Error::UnknownProvider(models::ProviderKind::VectorStore, name.to_string()))?;
        Ok(factory(settings)?)
    }
}
