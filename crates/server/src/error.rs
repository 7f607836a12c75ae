use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_core::report::ReportError;
use serde_json::json;

use crate::clients::openai::LlmError;
use crate::clients::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl AppError {
    /// Failures while acquiring a single game are the user's to fix
    /// (bad link, private game, paste the PGN instead).
    pub fn from_game_fetch(err: FetchError) -> Self {
        AppError::BadRequest(err.to_string())
    }

    /// Opponent lookups: an unknown player or an empty history is a client
    /// error, anything else is the platform's fault.
    pub fn from_opponent_fetch(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { .. } => AppError::BadRequest(
                "Player not found or no public games on this platform.".to_string(),
            ),
            FetchError::NoGamesFound { .. } => {
                AppError::BadRequest("No games found for this user.".to_string())
            }
            other => {
                tracing::warn!(error = %other, "Upstream failure during opponent lookup");
                AppError::BadGateway(format!(
                    "Error while retrieving games from {}.",
                    other.platform()
                ))
            }
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Llm(e) => {
                tracing::error!(error = ?e, "LLM call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
