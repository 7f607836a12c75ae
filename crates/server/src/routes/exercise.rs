use axum::Json;
use chess_core::exercise::{check_move, ExerciseOutcome};
use chess_core::report::MoveVariant;
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::AppJson;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCheckRequest {
    pub position_fen: String,
    #[serde(rename = "move")]
    pub mv: String,
    #[serde(default)]
    pub move_variants: Vec<MoveVariant>,
    #[serde(default)]
    pub solution: Vec<String>,
}

/// POST /api/exercise/check
pub async fn check_exercise_move(
    AppJson(req): AppJson<ExerciseCheckRequest>,
) -> Result<Json<ExerciseOutcome>, AppError> {
    if req.mv.trim().is_empty() {
        return Err(AppError::BadRequest("A move is required.".to_string()));
    }
    let outcome = check_move(&req.position_fen, &req.mv, &req.move_variants, &req.solution)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    tracing::debug!(legal = outcome.legal, san = ?outcome.san, "Checked exercise move");
    Ok(Json(outcome))
}
