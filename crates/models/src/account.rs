use serde::{Deserialize, Serialize};

use crate::Id;

/// ProviderKind names the role a configured provider fills within an
/// account's configuration blob. The same account may configure distinct
/// providers for each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    CodeHost,
    Embedding,
    Chat,
    VectorStore,
}

/// ProviderConfig is the opaque, provider-specific configuration blob
/// stored inside an account's configuration. Its shape is defined by
/// whichever provider implementation consumes it; the engine only
/// threads it through to the [`crate::account::Account`] resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Opaque identifier of which concrete provider implementation to
    /// instantiate, e.g. "github", "openai-embeddings", "qdrant".
    pub provider: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// AccountConfig is the full, versioned configuration blob held by an
/// [`Account`], enumerating which providers back each role.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl AccountConfig {
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.kind == kind)
    }
}

/// Account is a tenant: it owns an opaque API key used to authenticate
/// control-plane requests, and a configuration blob naming the providers
/// and credentials used for every scan run on its behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct Account {
    pub id: Id,
    pub name: String,
    pub api_key_hash: String,
    #[cfg_attr(feature = "sqlx-support", sqlx(json))]
    pub config: AccountConfig,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
