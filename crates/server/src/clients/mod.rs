pub mod chess_com;
pub mod identifier;
pub mod lichess;
pub mod openai;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Serialize;

pub const USER_AGENT: &str = "ChessFocus/1.0 (contact: contact@chessfocus.app)";

/// Failures talking to a chess platform. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Game or player not found on {platform}")]
    NotFound { platform: &'static str },

    #[error("{platform} rate limit reached, try again in a few moments")]
    RateLimited { platform: &'static str },

    #[error("{platform} is unavailable: {reason}")]
    Unavailable { platform: &'static str, reason: String },

    #[error("No games found for this {platform} user")]
    NoGamesFound { platform: &'static str },

    #[error("Unexpected response from {platform}: {reason}")]
    Malformed { platform: &'static str, reason: String },

    #[error(
        "Could not retrieve the PGN from Chess.com for game {game_id}. \
         Copy the PGN from the game page (Download PGN) and paste it instead."
    )]
    PgnUnavailable { game_id: String },
}

impl FetchError {
    pub fn platform(&self) -> &'static str {
        match self {
            FetchError::NotFound { platform }
            | FetchError::RateLimited { platform }
            | FetchError::Unavailable { platform, .. }
            | FetchError::NoGamesFound { platform }
            | FetchError::Malformed { platform, .. } => *platform,
            FetchError::PgnUnavailable { .. } => chess_com::PLATFORM,
        }
    }
}

/// Map a non-success status onto the taxonomy.
pub(crate) fn status_error(platform: &'static str, status: StatusCode) -> FetchError {
    match status {
        StatusCode::NOT_FOUND => FetchError::NotFound { platform },
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited { platform },
        other => FetchError::Unavailable {
            platform,
            reason: format!("HTTP {other}"),
        },
    }
}

pub(crate) fn request_error(platform: &'static str, err: reqwest::Error) -> FetchError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        format!("request error: {err}")
    };
    FetchError::Unavailable { platform, reason }
}

pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).timeout(timeout).build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingVariant {
    UltraBullet,
    Bullet,
    Blitz,
    Rapid,
    Classical,
    Correspondence,
    Daily,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingPoint {
    pub date: NaiveDate,
    pub rating: i32,
    pub variant: RatingVariant,
}
