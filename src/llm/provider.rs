use async_trait::async_trait;
use crate::types::{LLMRequest, LLMResponse, AppResult};

/// A chat-completion backend.
#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;

    /// Short name used in logs
    fn provider_name(&self) -> &str;
}
