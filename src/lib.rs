// Metadata Creator - chat service that drafts dataset metadata from file samples

pub mod agents;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod routes;
pub mod sampler;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
