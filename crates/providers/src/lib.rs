//! Provider ports consumed by the phase runners. Concrete implementations
//! — a hosted code-host API client, embedding/chat providers, a
//! vector-similarity store — are external collaborators; only their
//! contracts live here.

mod chat;
mod code_host;
mod embedding;
pub mod error;
mod vector_store;

pub use chat::{ChatBatchProvider, ChatItemResult, ChatMessage, ChatProvider, ChatRequest, ChatResponse, Usage};
pub use code_host::{CodeHostClient, DiffFetch, PrSummary};
pub use embedding::{BatchOptions, EmbedRequest, EmbedResult, EmbeddingBatchProvider, EmbeddingProvider};
pub use vector_store::{point_id, SearchFilter, SearchHit, VectorPoint, VectorStore};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
