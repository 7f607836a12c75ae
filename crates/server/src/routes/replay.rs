use axum::Json;
use chess_core::annotate::{self, ReplayView};
use chess_core::game_data::GameRecord;
use chess_core::replay;
use chess_core::report::{KeyMoment, Mistake};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::AppJson;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    Mistake {
        mistake: Mistake,
    },
    KeyMoment {
        #[serde(rename = "keyMoment")]
        key_moment: KeyMoment,
    },
    /// Step-through navigation to a ply.
    Ply {
        ply: usize,
        #[serde(default)]
        mistakes: Vec<Mistake>,
        #[serde(default, rename = "keyMoments")]
        key_moments: Vec<KeyMoment>,
    },
    /// Jump to a move number (lands after Black's reply).
    MoveNumber {
        #[serde(rename = "moveNumber")]
        move_number: u32,
        #[serde(default)]
        mistakes: Vec<Mistake>,
        #[serde(default, rename = "keyMoments")]
        key_moments: Vec<KeyMoment>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRequest {
    #[serde(default)]
    pub pgn: String,
    pub selection: Selection,
    #[serde(default)]
    pub show_solution: bool,
}

/// Board data for one selection; rebuilt from the PGN on every call.
pub fn view_for(game: &GameRecord, selection: &Selection, show_solution: bool) -> ReplayView {
    match selection {
        Selection::Mistake { mistake } => annotate::mistake_view(game, mistake, show_solution),
        Selection::KeyMoment { key_moment } => annotate::key_moment_view(game, key_moment),
        Selection::Ply { ply, mistakes, key_moments } => {
            annotate::ply_view(game, *ply, mistakes, key_moments, show_solution)
        }
        Selection::MoveNumber { move_number, mistakes, key_moments } => {
            let ply = replay::ply_for_move_number(*move_number, game.ply_count()).unwrap_or(0);
            annotate::ply_view(game, ply, mistakes, key_moments, show_solution)
        }
    }
}

/// POST /api/game-replay
pub async fn replay_selection(AppJson(req): AppJson<ReplayRequest>) -> Result<Json<ReplayView>, AppError> {
    if req.pgn.trim().is_empty() {
        return Err(AppError::BadRequest("A PGN is required to replay a game.".to_string()));
    }
    let game = GameRecord::from_pgn(&req.pgn);
    let view = view_for(&game, &req.selection, req.show_solution);
    if !view.anomalies.is_empty() {
        tracing::warn!(anomalies = view.anomalies.len(), "Replay skipped unplayable moves");
    }
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = "1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0";

    fn request(body: serde_json::Value) -> ReplayRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn selections_deserialize() {
        let req = request(serde_json::json!({
            "pgn": GAME,
            "selection": {"type": "keyMoment", "keyMoment": {"moveNumber": 3, "description": "", "evaluationChange": "-250"}},
        }));
        assert!(matches!(req.selection, Selection::KeyMoment { ref key_moment } if key_moment.evaluation_change == -250));
        assert!(!req.show_solution);

        let req = request(serde_json::json!({
            "pgn": GAME,
            "selection": {"type": "moveNumber", "moveNumber": 2},
            "showSolution": true,
        }));
        assert!(matches!(req.selection, Selection::MoveNumber { move_number: 2, .. }));
    }

    #[test]
    fn move_number_jumps_after_blacks_reply() {
        let game = GameRecord::from_pgn(GAME);
        let selection = Selection::MoveNumber { move_number: 2, mistakes: Vec::new(), key_moments: Vec::new() };
        let view = view_for(&game, &selection, false);
        assert_eq!(view.ply, Some(3));
        assert_eq!(view.played_move.map(|m| m.san), Some("Nc6".to_string()));

        let selection = Selection::MoveNumber { move_number: 40, mistakes: Vec::new(), key_moments: Vec::new() };
        assert_eq!(view_for(&game, &selection, false).ply, Some(6));
    }

    #[test]
    fn ply_selection_carries_key_moments() {
        let game = GameRecord::from_pgn(GAME);
        let req = request(serde_json::json!({
            "pgn": GAME,
            "selection": {"type": "ply", "ply": 4, "keyMoments": [
                {"moveNumber": 3, "description": "Early queen", "evaluationChange": 90}
            ]},
        }));
        let view = view_for(&game, &req.selection, req.show_solution);
        assert_eq!(view.annotations.len(), 1);
        assert_eq!(view.annotations[0].to_square, "h5");
    }

    #[test]
    fn mistake_selection_shows_solution_on_request() {
        let game = GameRecord::from_pgn(GAME);
        let req = request(serde_json::json!({
            "pgn": GAME,
            "selection": {"type": "mistake", "mistake": {
                "moveNumber": 3, "movePlayed": "Nf6", "category": "blunder",
                "explanation": "Allows mate", "bestSuggestion": "Best: g6"
            }},
            "showSolution": true,
        }));
        let view = view_for(&game, &req.selection, req.show_solution);
        assert_eq!(view.best_move.map(|m| m.san), Some("g6".to_string()));
        assert_eq!(view.annotations.len(), 2);
    }
}
