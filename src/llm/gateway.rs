//! Model Gateway
//!
//! Sends the system prompt followed by the conversation to the configured
//! serving endpoint and returns the assistant's reply. `complete` is total:
//! every failure is folded into a [`Completion`] that still renders as
//! displayable text, so a chat turn can always be closed with an assistant
//! message.
//!
//! The whole history goes out on every call unless a [`HistoryWindow`] is
//! configured. Long sessions therefore grow the request without bound.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_MAX_TOKENS};
use crate::conversation::{Conversation, HistoryWindow};
use crate::llm::provider::LLMAdapter;
use crate::prompt::SystemPrompt;
use crate::types::{LLMMessage, LLMRequest};

pub const ENDPOINT_NOT_SET: &str = "Error: DATABRICKS_SERVING_ENDPOINT is not set. Add it to your .env file for local development, or ensure the app is deployed with a serving endpoint resource.";
pub const EMPTY_REPLY: &str = "Sorry, I couldn't process that request.";

/// Result of one gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The model's reply text.
    Reply(String),
    /// No serving endpoint name is configured.
    NotConfigured,
    /// The call succeeded but carried no usable choice.
    Empty,
    /// Transport, authentication or response-format failure.
    Failed(String),
}

impl Completion {
    pub fn is_reply(&self) -> bool {
        matches!(self, Completion::Reply(_))
    }

    /// Text to append to the conversation as the assistant's turn.
    pub fn text(&self) -> String {
        match self {
            Completion::Reply(text) => text.clone(),
            Completion::NotConfigured => ENDPOINT_NOT_SET.to_string(),
            Completion::Empty => EMPTY_REPLY.to_string(),
            Completion::Failed(message) => format!("Error calling model: {}", message),
        }
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}

pub struct ModelGateway {
    adapter: Arc<dyn LLMAdapter>,
    endpoint: Option<String>,
    system_prompt: SystemPrompt,
    max_tokens: u32,
    window: HistoryWindow,
}

impl ModelGateway {
    pub fn new(
        adapter: Arc<dyn LLMAdapter>,
        endpoint: Option<String>,
        system_prompt: SystemPrompt,
    ) -> Self {
        Self {
            adapter,
            endpoint,
            system_prompt,
            max_tokens: DEFAULT_MAX_TOKENS,
            window: HistoryWindow::Unbounded,
        }
    }

    pub fn from_config(
        adapter: Arc<dyn LLMAdapter>,
        system_prompt: SystemPrompt,
        config: &Config,
    ) -> Self {
        if config.serving.endpoint.is_none() {
            warn!("DATABRICKS_SERVING_ENDPOINT not set (use .env locally or bundle config on Databricks)");
        }

        Self::new(adapter, config.serving.endpoint.clone(), system_prompt)
            .with_max_tokens(config.serving.max_tokens)
            .with_history_window(HistoryWindow::from_limit(config.history.max_messages))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_history_window(mut self, window: HistoryWindow) -> Self {
        self.window = window;
        self
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// System entry first, then the (windowed) conversation in order.
    pub fn build_request(&self, endpoint: &str, conversation: &Conversation) -> LLMRequest {
        let history = self.window.select(conversation.messages());

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(LLMMessage::system(self.system_prompt.as_str()));
        messages.extend(history.iter().map(LLMMessage::from));

        LLMRequest {
            endpoint: endpoint.to_string(),
            messages,
            max_tokens: Some(self.max_tokens),
        }
    }

    pub async fn complete(&self, conversation: &Conversation) -> Completion {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Completion::NotConfigured;
        };

        let request = self.build_request(endpoint, conversation);
        info!(
            endpoint,
            provider = self.adapter.provider_name(),
            history_len = conversation.len(),
            sent = request.messages.len(),
            "Calling model"
        );

        match self.adapter.create_chat_completion(&request).await {
            Ok(response) => match response.content {
                Some(content) if !content.trim().is_empty() => {
                    info!(
                        endpoint,
                        reply_len = content.len(),
                        finish_reason = ?response.finish_reason,
                        "Model replied"
                    );
                    Completion::Reply(content)
                }
                _ => {
                    warn!(endpoint, "Model returned no choices");
                    Completion::Empty
                }
            },
            Err(e) => {
                error!(endpoint, error = %e, "Model call failed");
                Completion::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockAdapter;
    use crate::types::{AppError, LLMRole};

    fn gateway(adapter: Arc<MockAdapter>, endpoint: Option<&str>) -> ModelGateway {
        ModelGateway::new(
            adapter,
            endpoint.map(str::to_string),
            SystemPrompt::from_text("Produce metadata JSON."),
        )
    }

    #[tokio::test]
    async fn test_unset_endpoint_names_the_variable() {
        let adapter = Arc::new(MockAdapter::new());
        let completion = gateway(adapter.clone(), None).complete(&Conversation::new()).await;

        assert_eq!(completion, Completion::NotConfigured);
        assert!(completion.text().contains("DATABRICKS_SERVING_ENDPOINT"));
        assert!(adapter.requests().is_empty());
    }

    #[tokio::test]
    async fn test_system_prompt_is_prepended_to_full_history() {
        let adapter = Arc::new(MockAdapter::new().reply(Some("Here is your metadata")));
        let gateway = gateway(adapter.clone(), Some("metadata-llm"));

        let mut conversation = Conversation::new();
        conversation.append_user("[File uploaded: a.csv]");
        conversation.append_assistant("Thanks");
        conversation.append_user("Describe this dataset");

        let completion = gateway.complete(&conversation).await;
        assert_eq!(completion, Completion::Reply("Here is your metadata".to_string()));

        let requests = adapter.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(sent.endpoint, "metadata-llm");
        assert_eq!(sent.max_tokens, Some(2000));
        assert_eq!(sent.messages.len(), 4);
        assert_eq!(sent.messages[0].role, LLMRole::System);
        assert_eq!(sent.messages[0].content, "Produce metadata JSON.");
        assert_eq!(sent.messages[1].content, "[File uploaded: a.csv]");
        assert_eq!(sent.messages[2].role, LLMRole::Assistant);
        assert_eq!(sent.messages[3].content, "Describe this dataset");
    }

    #[tokio::test]
    async fn test_empty_conversation_still_gets_text() {
        let adapter = Arc::new(MockAdapter::new());
        let completion = gateway(adapter, Some("metadata-llm"))
            .complete(&Conversation::new())
            .await;
        assert!(!completion.text().is_empty());
    }

    #[tokio::test]
    async fn test_missing_or_blank_content_uses_fallback() {
        let adapter = Arc::new(MockAdapter::new().reply(None).reply(Some("   ")));
        let gateway = gateway(adapter, Some("metadata-llm"));
        let conversation = Conversation::new();

        assert_eq!(gateway.complete(&conversation).await.text(), EMPTY_REPLY);
        assert_eq!(gateway.complete(&conversation).await.text(), EMPTY_REPLY);
    }

    #[tokio::test]
    async fn test_failures_become_error_text() {
        let adapter = Arc::new(
            MockAdapter::new().fail(AppError::LLMApi("serving endpoint returned 403".to_string())),
        );
        let completion = gateway(adapter, Some("metadata-llm"))
            .complete(&Conversation::new())
            .await;

        assert!(!completion.is_reply());
        let text = completion.text();
        assert!(text.starts_with("Error calling model: "));
        assert!(text.contains("403"));
    }

    #[tokio::test]
    async fn test_history_window_limits_outbound_messages_only() {
        let adapter = Arc::new(MockAdapter::new());
        let gateway = gateway(adapter.clone(), Some("metadata-llm"))
            .with_history_window(HistoryWindow::LastN(2))
            .with_max_tokens(512);

        let mut conversation = Conversation::new();
        for i in 0..5 {
            conversation.append_user(format!("m{i}"));
        }

        gateway.complete(&conversation).await;
        let sent = &adapter.requests()[0];
        assert_eq!(sent.max_tokens, Some(512));
        assert_eq!(sent.messages.len(), 3);
        assert_eq!(sent.messages[1].content, "m3");
        assert_eq!(conversation.len(), 5);
    }
}
