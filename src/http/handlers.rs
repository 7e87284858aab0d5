use super::state::AppState;
use crate::error::SessionError;
use crate::session::ToggleOutcome;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub status: String,
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status_text: String,
}

// ============================================================================
// Handlers
// ============================================================================

fn session_error_response(e: SessionError) -> axum::response::Response {
    let code = match e {
        SessionError::PermissionDenied | SessionError::DeviceUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        SessionError::Connection(_) => StatusCode::BAD_GATEWAY,
    };
    (
        code,
        Json(ErrorResponse {
            status_text: e.status_text().to_string(),
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// POST /voice/toggle
/// The mic-button action: stop the live session, or start a new one
pub async fn toggle_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.toggle().await {
        Ok(ToggleOutcome::Started { session_id }) => {
            info!("Voice session started via HTTP: {}", session_id);
            (
                StatusCode::OK,
                Json(ToggleResponse {
                    status: "listening".to_string(),
                    session_id: Some(session_id),
                    message: "Listening. Say something.".to_string(),
                }),
            )
                .into_response()
        }
        Ok(ToggleOutcome::Stopped) => (
            StatusCode::OK,
            Json(ToggleResponse {
                status: "stopped".to_string(),
                session_id: None,
                message: "Session stopped.".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to toggle voice session: {}", e);
            session_error_response(e)
        }
    }
}

/// POST /voice/stop
/// Stop the live session; a no-op when nothing is running
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    state.engine.stop().await;
    (
        StatusCode::OK,
        Json(ToggleResponse {
            status: "stopped".to_string(),
            session_id: None,
            message: "Session stopped.".to_string(),
        }),
    )
}

/// GET /voice/status
/// Status of the current session
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.status().await {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No voice session".to_string(),
                status_text: "Tap the mic to manage your stock.".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /voice/transcript
/// Transcript of the current session (accumulated so far)
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let transcript = state.engine.transcript().await;
    (StatusCode::OK, Json(transcript))
}

/// GET /inventory
/// Read-only listing of the inventory
pub async fn list_inventory(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.store().list_all().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => {
            error!("Failed to list inventory: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to list inventory: {e:#}"),
                    status_text: "Inventory unavailable.".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
