//! HTTP Routes
//!
//! - `/` - Chat page
//! - `/api/sessions` - Session lifecycle, messages and uploads
//! - `/api/health` - Health check

pub mod health;
pub mod sessions;
pub mod ui;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload_bytes = state.agent.uploads().max_bytes();

    Router::new()
        .merge(sessions::router(state.clone()))
        .merge(health::router(state))
        .merge(ui::router(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::agents::{FileUploadAgent, MetadataAgent};
    use crate::conversation::SessionRegistry;
    use crate::llm::mock::MockAdapter;
    use crate::llm::ModelGateway;
    use crate::prompt::SystemPrompt;
    use crate::sampler::FileSampler;

    fn state_with(adapter: Arc<MockAdapter>, endpoint: Option<&str>, max_bytes: usize) -> AppState {
        let gateway = ModelGateway::new(
            adapter,
            endpoint.map(str::to_string),
            SystemPrompt::from_text("Write metadata."),
        );
        let uploads = FileUploadAgent::new(FileSampler::new(10, max_bytes));

        AppState {
            sessions: SessionRegistry::new(),
            agent: Arc::new(MetadataAgent::new(uploads, Arc::new(gateway))),
        }
    }

    fn state(adapter: Arc<MockAdapter>) -> AppState {
        state_with(adapter, Some("metadata-llm"), 1024 * 1024)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn new_session(state: &AppState) -> uuid::Uuid {
        state.sessions.create().await
    }

    #[tokio::test]
    async fn test_create_and_fetch_session() {
        let app = create_router(state(Arc::new(MockAdapter::new())));

        let response = app
            .clone()
            .oneshot(Request::builder().method("POST").uri("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(Request::builder().uri(format!("/api/sessions/{}", id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["messages"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_send_message_round_trip() {
        let state = state(Arc::new(MockAdapter::new().reply(Some("A dataset of stations."))));
        let id = new_session(&state).await;
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", id),
                serde_json::json!({ "message": "Describe this dataset" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["input"], "");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "A dataset of stations.");
    }

    #[tokio::test]
    async fn test_blank_message_leaves_input() {
        let state = state(Arc::new(MockAdapter::new()));
        let id = new_session(&state).await;
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", id),
                serde_json::json!({ "message": "  " }),
            ))
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["input"], "  ");
        assert_eq!(body["messages"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_data_url_upload() {
        let state = state(Arc::new(MockAdapter::new()));
        let id = new_session(&state).await;
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/uploads", id),
                serde_json::json!({
                    "filename": "tiny.csv",
                    "contents": "data:text/csv;base64,YSxiCjEsMgo="
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["preview"].as_str().unwrap().starts_with("File: tiny.csv"));
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0]["content"]
            .as_str()
            .unwrap()
            .starts_with("[File uploaded: tiny.csv]"));
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let state = state(Arc::new(MockAdapter::new()));
        let id = new_session(&state).await;
        let app = create_router(state);

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nalpha\nbeta\ngamma\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{}/files", id))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["preview"],
            "File: notes.txt\nSample data (first 10 lines):\n\nalpha\nbeta\ngamma"
        );
    }

    #[tokio::test]
    async fn test_oversized_multipart_upload_is_rejected() {
        let state = state_with(Arc::new(MockAdapter::new()), Some("metadata-llm"), 8);
        let id = new_session(&state).await;
        let app = create_router(state.clone());

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.txt\"\r\n\r\n0123456789abcdef\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{}/files", id))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(state.sessions.snapshot(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_multipart_over_body_limit_is_payload_too_large() {
        let state = state_with(Arc::new(MockAdapter::new()), Some("metadata-llm"), 8);
        let id = new_session(&state).await;
        let app = create_router(state.clone());

        let boundary = "XBOUNDARYX";
        let file = "x".repeat(200 * 1024);
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"huge.txt\"\r\n\r\n{file}\r\n--{b}--\r\n",
            b = boundary,
            file = file
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{}/files", id))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(state.sessions.snapshot(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_busy_session_is_refused() {
        let state = state(Arc::new(MockAdapter::new()));
        let id = new_session(&state).await;
        let _in_flight = state.sessions.begin_turn(&id).await.unwrap();
        let app = create_router(state.clone());

        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", id),
                serde_json::json!({ "message": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = create_router(state(Arc::new(MockAdapter::new())));
        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{}/messages", uuid::Uuid::new_v4()),
                serde_json::json!({ "message": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_end_session() {
        let state = state(Arc::new(MockAdapter::new()));
        let id = new_session(&state).await;
        let app = create_router(state.clone());

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/sessions/{}", id))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_unset_endpoint() {
        let app = create_router(state_with(Arc::new(MockAdapter::new()), None, 1024));
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["serving_endpoint"].is_null());
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = create_router(state(Arc::new(MockAdapter::new())));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Metadata Creator"));
    }
}
