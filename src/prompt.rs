//! System prompt loading.
//!
//! The metadata definition and instructions for the model live in an
//! external text file. It is read once at startup; a missing or empty file
//! stops the process before the server binds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::types::{AppError, AppResult};

/// Immutable system instruction shared by every model call.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    text: Arc<str>,
    source: PathBuf,
}

impl SystemPrompt {
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Prompt(format!(
                "Metadata prompt file not found: {}. Set METADATA_PROMPT_PATH or place metadata_prompt.txt in the working directory.",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Prompt(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let text = raw.trim();
        if text.is_empty() {
            return Err(AppError::Prompt(format!(
                "Metadata prompt file is empty: {}",
                path.display()
            )));
        }

        info!(path = %path.display(), chars = text.len(), "System prompt loaded");

        Ok(Self {
            text: Arc::from(text),
            source: path.to_path_buf(),
        })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            text: Arc::from(text.trim()),
            source: PathBuf::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}
