use async_trait::async_trait;

use crate::embedding::BatchOptions;
use crate::error::ChatError;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// response is the provider's raw JSON reply; callers parse it into
    /// their own expected shape (an intent summary, a pairwise verdict, a
    /// ranked list) and treat a parse failure as a per-item error rather
    /// than aborting.
    pub response: serde_json::Value,
    pub usage: Usage,
}

/// ChatRequest pairs an opaque id with the message list for one
/// conversation, for use in a batch submission.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub id: String,
    pub messages: Vec<ChatMessage>,
}

/// ChatItemResult is one entry of a batch response. A per-item provider
/// error does not abort the whole batch — it's still a request Ok from
/// the batch's perspective, just carrying `Err` in its slot, so the
/// verification phase can record `relationship = "error"` for that one
/// pair and keep going.
#[derive(Debug, Clone)]
pub struct ChatItemResult {
    pub id: String,
    pub result: Result<ChatResponse, String>,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, ChatError>;
}

#[async_trait]
pub trait ChatBatchProvider: ChatProvider {
    async fn chat_batch<'a>(
        &self,
        requests: &[ChatRequest],
        options: BatchOptions<'a>,
    ) -> Result<Vec<ChatItemResult>, ChatError>;
}
