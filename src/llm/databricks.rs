// Databricks Model Serving adapter
// Queries a chat-completion serving endpoint:
//   POST {host}/serving-endpoints/{name}/invocations
// The request and response bodies follow the OpenAI chat format.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::auth::WorkspaceAuth;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, LLMResponse, TokenUsage};

pub struct DatabricksAdapter {
    client: Client,
    auth: Arc<WorkspaceAuth>,
}

// Request types for the serving endpoint
#[derive(Serialize)]
struct ServingChatRequest<'a> {
    messages: &'a [LLMMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

// Response types for the serving endpoint
#[derive(Deserialize)]
struct ServingChatResponse {
    #[serde(default)]
    choices: Vec<ServingChoice>,
    #[serde(default)]
    usage: Option<ServingUsage>,
}

#[derive(Deserialize)]
struct ServingChoice {
    #[serde(default)]
    message: Option<ServingResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ServingResponseMessage {
    #[serde(default)]
    content: Option<ServingContent>,
}

// Some foundation models answer with a list of typed blocks instead of a string
#[derive(Deserialize)]
#[serde(untagged)]
enum ServingContent {
    Text(String),
    Blocks(Vec<ServingContentBlock>),
}

#[derive(Deserialize)]
struct ServingContentBlock {
    #[serde(rename = "type", default)]
    block_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ServingUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ServingErrorResponse {
    #[serde(default)]
    error_code: Option<String>,
    message: String,
}

impl ServingContent {
    fn into_text(self) -> String {
        match self {
            ServingContent::Text(text) => text,
            ServingContent::Blocks(blocks) => blocks
                .into_iter()
                .filter(|b| b.block_type.as_deref().map_or(true, |t| t == "text"))
                .filter_map(|b| b.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl DatabricksAdapter {
    pub fn new(auth: Arc<WorkspaceAuth>) -> Self {
        Self {
            client: Client::new(),
            auth,
        }
    }

    /// The endpoint name is a single path segment; `/`, spaces and the
    /// like are percent-encoded rather than changing the route.
    fn invocations_url(&self, endpoint: &str) -> AppResult<Url> {
        let mut url = Url::parse(self.auth.host())
            .map_err(|e| AppError::Config(format!("invalid Databricks host: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("invalid Databricks host: {}", self.auth.host())))?
            .pop_if_empty()
            .extend(["serving-endpoints", endpoint, "invocations"]);
        Ok(url)
    }
}

#[async_trait]
impl LLMAdapter for DatabricksAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = self.invocations_url(&request.endpoint)?;
        let token = self.auth.bearer_token().await?;

        let body = ServingChatRequest {
            messages: &request.messages,
            max_tokens: request.max_tokens,
        };

        debug!(
            endpoint = %request.endpoint,
            messages = request.messages.len(),
            max_tokens = ?request.max_tokens,
            "Querying serving endpoint"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("request to serving endpoint failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<ServingErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "serving endpoint returned {}: {} (code: {})",
                    status,
                    error_response.message,
                    error_response.error_code.as_deref().unwrap_or("unknown")
                )));
            }

            return Err(AppError::LLMApi(format!(
                "serving endpoint returned {}: {}",
                status, error_text
            )));
        }

        let serving_response: ServingChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("failed to parse serving response: {}", e)))?;

        let usage = serving_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let (content, finish_reason) = match serving_response.choices.into_iter().next() {
            Some(choice) => (
                choice
                    .message
                    .and_then(|m| m.content)
                    .map(ServingContent::into_text),
                choice.finish_reason,
            ),
            None => (None, None),
        };

        Ok(LLMResponse {
            content,
            finish_reason,
            usage,
        })
    }

    fn provider_name(&self) -> &str {
        "databricks"
    }
}
