//! ServiceResolver assembles the concrete provider instances an account's
//! configuration names — code host, embedding, chat, vector store — and
//! caches the resulting handles per account so repeated scans don't pay the
//! construction cost (opening connections, parsing credentials) every time.
//!
//! Concrete providers are external collaborators (see `providers`); this
//! crate only knows how to go from a `(ProviderKind, provider name)` pair to
//! a boxed trait object, via a caller-supplied [`ProviderRegistry`].

mod registry;

pub use registry::{ChatFactory, CodeHostFactory, EmbeddingFactory, ProviderRegistry, VectorStoreFactory};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use models::{Id, ProviderKind};
use providers::{ChatBatchProvider, ChatProvider, CodeHostClient, EmbeddingBatchProvider, EmbeddingProvider, VectorStore};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error")]
    Store(#[from] store::Error),
    #[error("account {0:?} has no {1:?} provider configured")]
    MissingProvider(Id, ProviderKind),
    #[error("no registered factory for {0:?} provider {1:?}")]
    UnknownProvider(ProviderKind, String),
    #[error("provider construction failed: {0}")]
    Construction(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// EmbeddingHandle is the embedding provider resolved for one account,
/// capturing whether it additionally supports async-batch submission.
/// Consumers match on the variant rather than assuming a capability.
#[derive(Clone)]
pub enum EmbeddingHandle {
    Sync(Arc<dyn EmbeddingProvider>),
    Batch(Arc<dyn EmbeddingBatchProvider>),
}

impl EmbeddingHandle {
    pub fn as_provider(&self) -> &dyn EmbeddingProvider {
        match self {
            EmbeddingHandle::Sync(p) => p.as_ref(),
            EmbeddingHandle::Batch(p) => p.as_ref(),
        }
    }

    pub fn as_batch(&self) -> Option<&dyn EmbeddingBatchProvider> {
        match self {
            EmbeddingHandle::Batch(p) => Some(p.as_ref()),
            EmbeddingHandle::Sync(_) => None,
        }
    }
}

/// ChatHandle mirrors [`EmbeddingHandle`] for the chat provider.
#[derive(Clone)]
pub enum ChatHandle {
    Sync(Arc<dyn ChatProvider>),
    Batch(Arc<dyn ChatBatchProvider>),
}

impl ChatHandle {
    pub fn as_provider(&self) -> &dyn ChatProvider {
        match self {
            ChatHandle::Sync(p) => p.as_ref(),
            ChatHandle::Batch(p) => p.as_ref(),
        }
    }

    pub fn as_batch(&self) -> Option<&dyn ChatBatchProvider> {
        match self {
            ChatHandle::Batch(p) => Some(p.as_ref()),
            ChatHandle::Sync(_) => None,
        }
    }
}

/// AccountProviders bundles every provider role resolved for one account.
#[derive(Clone)]
pub struct AccountProviders {
    pub code_host: Arc<dyn CodeHostClient>,
    pub embedding: EmbeddingHandle,
    pub chat: ChatHandle,
    pub vector_store: Arc<dyn VectorStore>,
}

/// ServiceResolver is the Service Resolver component: given an account id,
/// it loads the account's [`models::AccountConfig`] from the store, asks the
/// [`ProviderRegistry`] to construct each configured provider, and caches the
/// resulting [`AccountProviders`] handle in memory for the life of the
/// process (or until [`ServiceResolver::invalidate`] is called, e.g. after a
/// control-plane config update).
pub struct ServiceResolver {
    store: store::Store,
    registry: ProviderRegistry,
    cache: RwLock<HashMap<Id, Arc<AccountProviders>>>,
}

impl ServiceResolver {
    pub fn new(store: store::Store, registry: ProviderRegistry) -> Self {
        Self {
            store,
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, account_id: Id) -> Result<Arc<AccountProviders>> {
        if let Some(cached) = self.cache.read().unwrap().get(&account_id).cloned() {
            return Ok(cached);
        }

        let account = self.store.require_account(account_id).await?;

        let code_host_cfg = account
            .config
            .provider(ProviderKind::CodeHost)
            .ok_or(Error::MissingProvider(account_id, ProviderKind::CodeHost))?;
        let embedding_cfg = account
            .config
            .provider(ProviderKind::Embedding)
            .ok_or(Error::MissingProvider(account_id, ProviderKind::Embedding))?;
        let chat_cfg = account
            .config
            .provider(ProviderKind::Chat)
            .ok_or(Error::MissingProvider(account_id, ProviderKind::Chat))?;
        let vector_store_cfg = account
            .config
            .provider(ProviderKind::VectorStore)
            .ok_or(Error::MissingProvider(account_id, ProviderKind::VectorStore))?;

        let providers = AccountProviders {
            code_host: self.registry.build_code_host(&code_host_cfg.provider, &code_host_cfg.settings)?,
            embedding: self.registry.build_embedding(&embedding_cfg.provider, &embedding_cfg.settings)?,
            chat: self.registry.build_chat(&chat_cfg.provider, &chat_cfg.settings)?,
            vector_store: self
                .registry
                .build_vector_store(&vector_store_cfg.provider, &vector_store_cfg.settings)?,
        };

        let arc = Arc::new(providers);
        self.cache.write().unwrap().insert(account_id, arc.clone());
        Ok(arc)
    }

    /// invalidate drops the cached handle for an account, forcing the next
    /// `resolve` to rebuild it from the account's current configuration.
    pub fn invalidate(&self, account_id: Id) {
        self.cache.write().unwrap().remove(&account_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    fn noop_registry() -> ProviderRegistry {
        ProviderRegistry::new()
            .with_code_host("fake", |_| Ok(Arc::new(providers::testing::FakeCodeHost::new())))
            .with_embedding("fake", |_| {
                Ok(EmbeddingHandle::Sync(Arc::new(providers::testing::FakeEmbeddingProvider::new(8))))
            })
            .with_chat("fake", |_| {
                Ok(ChatHandle::Sync(Arc::new(providers::testing::FakeChatProvider::new(|_| {
                    serde_json::json!({})
                }))))
            })
            .with_vector_store("fake", |_| Ok(Arc::new(providers::testing::InMemoryVectorStore::new())))
    }

    #[test]
    fn test_unknown_provider_name_errors() {
        let registry = noop_registry();
        let err = registry.build_code_host("github", &serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, Error::UnknownProvider(ProviderKind::CodeHost, _)));
    }
}
