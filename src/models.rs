use std::sync::Arc;

use crate::agents::MetadataAgent;
use crate::conversation::{Message, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub agent: Arc<MetadataAgent>,
}

// API Request/Response types

#[derive(Debug, serde::Serialize)]
pub struct SessionResponse {
    pub session_id: uuid::Uuid,
    pub messages: Vec<Message>,
}

#[derive(Debug, serde::Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Upload as produced by a browser `FileReader.readAsDataURL`
#[derive(Debug, serde::Deserialize)]
pub struct DataUrlUpload {
    pub filename: String,
    pub contents: String,
}

/// Result of a submit action: the full ordered conversation plus the
/// state the input box should be left in.
#[derive(Debug, serde::Serialize)]
pub struct TurnResponse {
    pub session_id: uuid::Uuid,
    pub messages: Vec<Message>,
    /// Text to leave in the message input; empty once consumed
    pub input: String,
    /// Preview of the uploaded file, for upload turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub serving_endpoint: Option<String>,
    pub active_sessions: usize,
}
