// File upload agent: turns one uploaded file into the user message that
// opens a metadata conversation.

use tracing::info;

use crate::sampler::{FilePreview, FileSampler};

/// An upload after sampling. The raw bytes are not kept.
#[derive(Debug, Clone)]
pub struct ProcessedUpload {
    pub filename: String,
    pub size: usize,
    pub preview: FilePreview,
}

impl ProcessedUpload {
    /// Content of the user message recorded for this upload.
    pub fn message_content(&self) -> String {
        format!("[File uploaded: {}]\n\n{}", self.filename, self.preview.text())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileUploadAgent {
    sampler: FileSampler,
}

impl FileUploadAgent {
    pub fn new(sampler: FileSampler) -> Self {
        Self { sampler }
    }

    pub fn max_bytes(&self) -> usize {
        self.sampler.max_bytes()
    }

    pub fn process_file(&self, filename: &str, content: &[u8]) -> ProcessedUpload {
        let preview = self.sampler.preview(filename, content);
        info!(
            filename,
            size = content.len(),
            failed = preview.is_failed(),
            "File processed"
        );

        ProcessedUpload {
            filename: filename.to_string(),
            size: content.len(),
            preview,
        }
    }

    /// Same as [`process_file`](Self::process_file) for a base64 data URL.
    pub fn process_data_url(&self, filename: &str, contents: &str) -> ProcessedUpload {
        let preview = self.sampler.preview_data_url(filename, contents);
        info!(
            filename,
            encoded_size = contents.len(),
            failed = preview.is_failed(),
            "Data URL upload processed"
        );

        ProcessedUpload {
            filename: filename.to_string(),
            size: contents.len(),
            preview,
        }
    }
}
