use std::sync::LazyLock;

use axum::{Extension, Json};
use chess_core::report::{validate_opponent_report, OpponentReport};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::clients::chess_com::ChessComClient;
use crate::clients::identifier::{classify, IdentifierKind, Platform};
use crate::clients::lichess::LichessClient;
use crate::clients::openai::OpenAiClient;
use crate::clients::RatingPoint;
use crate::error::AppError;
use crate::prompts;
use crate::routes::AppJson;

const DEFAULT_GAMES: i64 = 10;
const MIN_GAMES: i64 = 3;
const MAX_GAMES: i64 = 20;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,50}$").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformName {
    #[default]
    Lichess,
    Chesscom,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpponentAnalyzeRequest {
    #[serde(default)]
    pub platform: PlatformName,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub username: String,
    #[serde(default)]
    pub max_games: Option<i64>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Username is required and must be non-empty".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentAnalyzeResponse {
    pub report: OpponentReport,
    pub elo_history: Option<Vec<RatingPoint>>,
}

/// Missing or zero means the default; anything else is clamped.
pub fn games_to_fetch(max_games: Option<i64>) -> usize {
    let requested = max_games.filter(|n| *n != 0).unwrap_or(DEFAULT_GAMES);
    requested.clamp(MIN_GAMES, MAX_GAMES) as usize
}

/// A profile link decides the platform; a plain name keeps the requested one.
pub fn resolve_player(platform: PlatformName, username: &str) -> Result<(PlatformName, String), AppError> {
    let username = username.trim();
    let (platform, name) = if username.contains('/') {
        match classify(username) {
            Some(id) if id.kind == IdentifierKind::Username => {
                let platform = match id.platform {
                    Platform::Lichess => PlatformName::Lichess,
                    Platform::ChessCom => PlatformName::Chesscom,
                };
                (platform, id.value)
            }
            _ => {
                return Err(AppError::BadRequest(
                    "Expected a username or a Lichess/Chess.com profile link.".to_string(),
                ))
            }
        }
    } else {
        (platform, username.to_string())
    };

    if !USERNAME_RE.is_match(&name) {
        return Err(AppError::BadRequest(format!("Invalid username: {name}")));
    }
    Ok((platform, name))
}

/// POST /api/opponent-analyze
pub async fn analyze_opponent(
    Extension(lichess): Extension<LichessClient>,
    Extension(chess_com): Extension<ChessComClient>,
    Extension(llm): Extension<OpenAiClient>,
    AppJson(req): AppJson<OpponentAnalyzeRequest>,
) -> Result<Json<OpponentAnalyzeResponse>, AppError> {
    req.validate().map_err(|e| {
        let message = e
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Username is required and must be non-empty".to_string());
        AppError::BadRequest(message)
    })?;

    let (platform, username) = resolve_player(req.platform, &req.username)?;
    let count = games_to_fetch(req.max_games);
    tracing::info!(?platform, %username, count, "Analysing opponent");

    // Rating history is only worth fetching once the games came back.
    let (games, history) = match platform {
        PlatformName::Chesscom => {
            let games = chess_com
                .fetch_user_games(&username, count)
                .await
                .map_err(AppError::from_opponent_fetch)?;
            (games, chess_com.fetch_rating_history(&username).await)
        }
        PlatformName::Lichess => {
            let games = lichess
                .fetch_user_games(&username, count)
                .await
                .map_err(AppError::from_opponent_fetch)?;
            (games, lichess.fetch_rating_history(&username).await)
        }
    };
    tracing::info!(
        %username,
        games = games.len(),
        rating_points = history.len(),
        model = llm.model(),
        "Opponent games fetched"
    );

    let content = llm
        .complete_json(prompts::OPPONENT_SYSTEM, &prompts::opponent_prompt(&games))
        .await?;
    let report = validate_opponent_report(&content).map_err(|e| {
        tracing::error!(error = %e, "Opponent report failed validation");
        AppError::from(e)
    })?;

    Ok(Json(OpponentAnalyzeResponse {
        report,
        elo_history: (!history.is_empty()).then_some(history),
    }))
}
