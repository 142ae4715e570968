use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::models::{AppState, DataUrlUpload, SendMessageRequest, SessionResponse, TurnResponse};
use crate::types::{AppError, AppResult};

// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let max_bytes = state.agent.uploads().max_bytes();
    let multipart_limit = max_bytes.saturating_add(MULTIPART_OVERHEAD);
    // base64 grows the payload by a third
    let data_url_limit = (max_bytes / 3).saturating_mul(4).saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{session_id}", get(get_session).delete(end_session))
        .route("/api/sessions/{session_id}/messages", post(send_message))
        .route(
            "/api/sessions/{session_id}/files",
            post(upload_file).layer(DefaultBodyLimit::max(multipart_limit)),
        )
        .route(
            "/api/sessions/{session_id}/uploads",
            post(upload_data_url).layer(DefaultBodyLimit::max(data_url_limit)),
        )
        .with_state(state)
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session_id = state.sessions.create().await;
    info!(%session_id, "Session started");

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            messages: Vec::new(),
        }),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let conversation = state.sessions.snapshot(&session_id).await?;
    Ok(Json(SessionResponse {
        session_id,
        messages: conversation.messages().to_vec(),
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.sessions.remove(&session_id).await {
        info!(%session_id, "Session ended");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("session {}", session_id)))
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> AppResult<Json<TurnResponse>> {
    let message = request.message.unwrap_or_default();
    let mut conversation = state.sessions.begin_turn(&session_id).await?;
    info!(%session_id, message_len = message.len(), "Message received");

    let input = match state.agent.submit_message(&mut conversation, &message).await {
        Some(_) => String::new(),
        // nothing consumed: leave the input as the user typed it
        None => message,
    };

    Ok(Json(TurnResponse {
        session_id,
        messages: conversation.messages().to_vec(),
        input,
        preview: None,
    }))
}

async fn upload_file(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<TurnResponse>> {
    let mut conversation = state.sessions.begin_turn(&session_id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("malformed multipart body", e))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("failed to read upload", e))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::InvalidRequest("no file in upload".to_string()))?;

    let max_bytes = state.agent.uploads().max_bytes();
    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "{} is {} bytes, the limit is {}",
            filename,
            bytes.len(),
            max_bytes
        )));
    }

    info!(%session_id, filename = %filename, bytes = bytes.len(), "File upload received");
    let turn = state
        .agent
        .submit_file(&mut conversation, &filename, &bytes)
        .await;

    Ok(Json(TurnResponse {
        session_id,
        messages: conversation.messages().to_vec(),
        input: String::new(),
        preview: Some(turn.upload.preview.text()),
    }))
}

// Going over the body limit surfaces as a multipart error carrying 413.
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    let message = format!("{}: {}", context, e.body_text());
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(message)
    } else {
        AppError::InvalidRequest(message)
    }
}

async fn upload_data_url(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(upload): Json<DataUrlUpload>,
) -> AppResult<Json<TurnResponse>> {
    let mut conversation = state.sessions.begin_turn(&session_id).await?;
    info!(%session_id, filename = %upload.filename, encoded = upload.contents.len(), "Data URL upload received");

    let turn = state
        .agent
        .submit_data_url(&mut conversation, &upload.filename, &upload.contents)
        .await;

    Ok(Json(TurnResponse {
        session_id,
        messages: conversation.messages().to_vec(),
        input: String::new(),
        preview: Some(turn.upload.preview.text()),
    }))
}
