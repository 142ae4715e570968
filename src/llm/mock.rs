//! Scripted adapter for tests.
//!
//! Replies are handed out in order; once the script runs out every call
//! echoes the last user message. Every request is recorded.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::provider::LLMAdapter;
use crate::types::{AppResult, LLMRequest, LLMResponse, LLMRole};

#[derive(Default)]
pub struct MockAdapter {
    script: Mutex<VecDeque<AppResult<LLMResponse>>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, content: Option<&str>) -> Self {
        self.push(Ok(LLMResponse {
            content: content.map(str::to_string),
            finish_reason: Some("stop".to_string()),
            usage: None,
        }))
    }

    pub fn fail(self, error: crate::types::AppError) -> Self {
        self.push(Err(error))
    }

    fn push(self, entry: AppResult<LLMResponse>) -> Self {
        self.script.lock().unwrap().push_back(entry);
        self
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMAdapter for MockAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(entry) = self.script.lock().unwrap().pop_front() {
            return entry;
        }

        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == LLMRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("empty");

        Ok(LLMResponse {
            content: Some(format!("Mock response to: {}", last_user)),
            finish_reason: Some("stop".to_string()),
            usage: None,
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
