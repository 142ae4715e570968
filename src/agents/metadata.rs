//! Metadata Agent
//!
//! Drives one chat turn: record the user's input, ask the model with the
//! full history, record the reply. Both entry points take the session's
//! conversation by mutable reference, so the caller decides how sessions
//! are stored and serialized.

use std::sync::Arc;

use tracing::{debug, info};

use crate::agents::file_upload::{FileUploadAgent, ProcessedUpload};
use crate::conversation::Conversation;
use crate::llm::gateway::{Completion, ModelGateway};

/// What a completed upload turn produced.
#[derive(Debug, Clone)]
pub struct UploadTurn {
    pub upload: ProcessedUpload,
    pub completion: Completion,
}

pub struct MetadataAgent {
    uploads: FileUploadAgent,
    gateway: Arc<ModelGateway>,
}

impl MetadataAgent {
    pub fn new(uploads: FileUploadAgent, gateway: Arc<ModelGateway>) -> Self {
        Self { uploads, gateway }
    }

    pub fn uploads(&self) -> &FileUploadAgent {
        &self.uploads
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Sample an uploaded file, add it as a user message and get a reply.
    pub async fn submit_file(
        &self,
        conversation: &mut Conversation,
        filename: &str,
        content: &[u8],
    ) -> UploadTurn {
        let upload = self.uploads.process_file(filename, content);
        self.finish_upload(conversation, upload).await
    }

    pub async fn submit_data_url(
        &self,
        conversation: &mut Conversation,
        filename: &str,
        contents: &str,
    ) -> UploadTurn {
        let upload = self.uploads.process_data_url(filename, contents);
        self.finish_upload(conversation, upload).await
    }

    /// Add a typed message and get a reply. Blank input is ignored and
    /// returns `None` without touching the conversation.
    pub async fn submit_message(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> Option<Completion> {
        if message.trim().is_empty() {
            debug!("Ignoring blank message");
            return None;
        }

        conversation.append_user(message);
        Some(self.respond(conversation).await)
    }

    async fn finish_upload(
        &self,
        conversation: &mut Conversation,
        upload: ProcessedUpload,
    ) -> UploadTurn {
        conversation.append_user(upload.message_content());
        let completion = self.respond(conversation).await;
        UploadTurn { upload, completion }
    }

    async fn respond(&self, conversation: &mut Conversation) -> Completion {
        let completion = self.gateway.complete(conversation).await;
        conversation.append_assistant(completion.text());
        info!(
            history_len = conversation.len(),
            replied = completion.is_reply(),
            "Turn complete"
        );
        completion
    }
}
