use axum::{Extension, Json};
use chess_core::game_data::GameRecord;
use chess_core::report::{validate_game_report, GameReport};
use serde::{Deserialize, Serialize};

use crate::clients::chess_com::ChessComClient;
use crate::clients::identifier::{classify, IdentifierKind, Platform};
use crate::clients::lichess::LichessClient;
use crate::clients::openai::OpenAiClient;
use crate::error::AppError;
use crate::prompts;
use crate::routes::AppJson;

#[derive(Debug, Deserialize)]
#[serde(tag = "sourceType", rename_all = "lowercase")]
pub enum GameAnalyzeRequest {
    Pgn {
        #[serde(default)]
        pgn: String,
    },
    Url {
        #[serde(default)]
        link: String,
    },
}

#[derive(Debug, Serialize)]
pub struct GameAnalyzeResponse {
    pub report: GameReport,
    pub pgn: String,
}

/// POST /api/game-analyze
pub async fn analyze_game(
    Extension(lichess): Extension<LichessClient>,
    Extension(chess_com): Extension<ChessComClient>,
    Extension(llm): Extension<OpenAiClient>,
    AppJson(req): AppJson<GameAnalyzeRequest>,
) -> Result<Json<GameAnalyzeResponse>, AppError> {
    let pgn = resolve_pgn(req, &lichess, &chess_com).await?;

    let game = GameRecord::from_pgn(&pgn);
    if game.moves.is_empty() {
        return Err(AppError::BadRequest("The PGN contains no moves.".to_string()));
    }
    tracing::info!(
        moves = game.move_count(),
        plies = game.ply_count(),
        result = %game.result_tag,
        model = llm.model(),
        "Analysing game"
    );

    let content = llm.complete_json(prompts::GAME_SYSTEM, &prompts::game_prompt(&pgn)).await?;
    let report = validate_game_report(&content).map_err(|e| {
        tracing::error!(error = %e, "Game report failed validation");
        AppError::from(e)
    })?;

    tracing::info!(
        mistakes = report.mistakes.len(),
        key_moments = report.key_moments.len(),
        "Game report ready"
    );
    Ok(Json(GameAnalyzeResponse { report, pgn }))
}

async fn resolve_pgn(
    req: GameAnalyzeRequest,
    lichess: &LichessClient,
    chess_com: &ChessComClient,
) -> Result<String, AppError> {
    let link = match req {
        GameAnalyzeRequest::Pgn { pgn } => {
            let pgn = pgn.trim();
            if pgn.is_empty() {
                return Err(AppError::BadRequest(
                    "A PGN is required when sourceType is 'pgn' and cannot be empty.".to_string(),
                ));
            }
            return Ok(pgn.to_string());
        }
        GameAnalyzeRequest::Url { link } => link.trim().to_string(),
    };

    if link.is_empty() {
        return Err(AppError::BadRequest(
            "A link is required when sourceType is 'url' and cannot be empty.".to_string(),
        ));
    }

    let Some(identifier) = classify(&link) else {
        let shown: String = link.chars().take(50).collect();
        return Err(AppError::BadRequest(format!(
            "Invalid URL: \"{shown}\" is not recognised as a Lichess or Chess.com game link."
        )));
    };
    if identifier.kind == IdentifierKind::Username {
        return Err(AppError::BadRequest(
            "This is a profile link. Paste a game link, or use the opponent analysis for players."
                .to_string(),
        ));
    }

    let fetched = match identifier.platform {
        Platform::Lichess => lichess.fetch_game_pgn(&identifier.value).await,
        Platform::ChessCom => chess_com.fetch_game_pgn(&identifier.value, &identifier.path).await,
    };
    fetched.map_err(|e| {
        tracing::warn!(game_id = %identifier.value, error = %e, "Game fetch failed");
        AppError::from_game_fetch(e)
    })
}
