//! Agent System
//!
//! - **File Upload Agent**: samples an uploaded file into a chat message
//! - **Metadata Agent**: runs a chat turn against the serving endpoint
//!
//! ## Turn Overview
//!
//! ```text
//! file drop / send click
//!      │
//!      ▼
//! ┌─────────────┐
//! │ File Upload │  → preview text (uploads only)
//! │   Agent     │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Metadata   │  → append user turn, call model,
//! │   Agent     │    append assistant turn
//! └─────────────┘
//!      │
//!      ▼
//!  updated conversation
//! ```

pub mod file_upload;
pub mod metadata;

pub use file_upload::{FileUploadAgent, ProcessedUpload};
pub use metadata::{MetadataAgent, UploadTurn};
