// LLM abstraction layer

pub mod auth;
pub mod databricks;
pub mod gateway;
pub mod provider;

#[cfg(test)]
pub mod mock;

pub use auth::{Credentials, WorkspaceAuth};
pub use databricks::DatabricksAdapter;
pub use gateway::{Completion, ModelGateway};
pub use provider::LLMAdapter;
