use std::sync::LazyLock;

use chess_core::pgn::has_pgn_marker;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

use super::{request_error, status_error, FetchError, RatingPoint, RatingVariant};

pub const PLATFORM: &str = "Chess.com";

/// Only the most recent monthly archives are scanned.
const MAX_ARCHIVES: usize = 6;
const ARCHIVE_CONCURRENCY: usize = 3;

const STATS_VARIANTS: [(&str, RatingVariant); 4] = [
    ("chess_daily", RatingVariant::Daily),
    ("chess_rapid", RatingVariant::Rapid),
    ("chess_blitz", RatingVariant::Blitz),
    ("chess_bullet", RatingVariant::Bullet),
];

/// Script shapes that embed a whole game object.
static EMBEDDED_OBJECT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"window\.gameData\s*=\s*(\{[\s\S]*?\});",
        r"window\.gameAnalysis\s*=\s*(\{[\s\S]*?\});",
        r"gameData\s*:\s*(\{[\s\S]*?\}),",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static DOUBLE_QUOTED_PGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""pgn"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static SINGLE_QUOTED_PGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'pgn'\s*:\s*'((?:[^'\\]|\\.)*)'").unwrap());
static TAG_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[Event[^\]]*\][\s\S]*?)(?:\n\n|\n\[|</|$)").unwrap());

#[derive(Debug, Clone)]
pub struct ChessComClient {
    client: Client,
    web_url: String,
    api_url: String,
}

impl ChessComClient {
    pub fn new(client: Client, web_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client,
            web_url: web_url.into(),
            api_url: api_url.into(),
        }
    }

    /// PGN of one game. Tried in order, first PGN-looking text wins:
    /// the export endpoint, the download endpoint, data embedded in the game
    /// page, then the game page with `/pgn` appended.
    ///
    /// `page_path` is the path of the link the user submitted.
    pub async fn fetch_game_pgn(&self, game_id: &str, page_path: &str) -> Result<String, FetchError> {
        let page_path = if page_path.starts_with('/') {
            page_path.to_string()
        } else {
            format!("/game/live/{game_id}")
        };
        let pgn_accept = "application/x-chess-pgn, text/plain, */*";

        let export_url = format!("{}/game/export/{}", self.web_url, game_id);
        if let Some(pgn) = self.try_pgn_text(&export_url, pgn_accept).await {
            return Ok(pgn);
        }

        let download_url = format!("{}/game/download/{}", self.web_url, game_id);
        if let Some(pgn) = self.try_pgn_text(&download_url, pgn_accept).await {
            return Ok(pgn);
        }

        let page_url = format!("{}{}", self.web_url, page_path);
        match self.get_text(&page_url, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8").await {
            Ok(html) => {
                if let Some(pgn) = extract_pgn_from_html(&html) {
                    tracing::info!(%game_id, "Found PGN embedded in the game page");
                    return Ok(pgn);
                }
                tracing::debug!(%game_id, "Game page carries no PGN");
            }
            Err(e) => tracing::warn!(%game_id, "Game page fetch failed: {e}"),
        }

        let direct_url = if page_path.ends_with("/pgn") {
            page_url
        } else {
            format!("{}/pgn", page_url.trim_end_matches('/'))
        };
        if let Some(pgn) = self.try_pgn_text(&direct_url, pgn_accept).await {
            return Ok(pgn);
        }

        tracing::warn!(%game_id, "Every Chess.com PGN source failed");
        Err(FetchError::PgnUnavailable {
            game_id: game_id.to_string(),
        })
    }

    /// Most recent games of a user, at most `count`. Archives are read newest
    /// month first; a failing archive is skipped.
    pub async fn fetch_user_games(&self, username: &str, count: usize) -> Result<Vec<String>, FetchError> {
        let username = username.trim().to_lowercase();
        let url = format!("{}/pub/player/{}/games/archives", self.api_url, username);
        tracing::info!(%username, count, "Fetching Chess.com archives");

        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| request_error(PLATFORM, e))?;
        if !resp.status().is_success() {
            return Err(status_error(PLATFORM, resp.status()));
        }
        let data: Value = resp.json().await.map_err(|e| FetchError::Malformed {
            platform: PLATFORM,
            reason: format!("archive list is not JSON: {e}"),
        })?;

        let archives: Vec<String> = data["archives"]
            .as_array()
            .map(|list| list.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();
        let recent: Vec<String> = archives.iter().rev().take(MAX_ARCHIVES).cloned().collect();

        // `buffered` yields in input order, so games stay newest month first.
        let mut months = stream::iter(recent)
            .map(|archive_url| self.fetch_archive(archive_url))
            .buffered(ARCHIVE_CONCURRENCY);

        let mut games = Vec::new();
        while let Some((archive_url, result)) = months.next().await {
            match result {
                Ok(pgns) => games.extend(pgns.into_iter().take(count - games.len())),
                Err(e) => tracing::warn!(archive = %archive_url, "Skipping Chess.com archive: {e}"),
            }
            if games.len() >= count {
                break;
            }
        }

        if games.is_empty() {
            return Err(FetchError::NoGamesFound { platform: PLATFORM });
        }
        Ok(games)
    }

    /// Current rating per time control, dated today. Never fails.
    pub async fn fetch_rating_history(&self, username: &str) -> Vec<RatingPoint> {
        let username = username.trim().to_lowercase();
        let url = format!("{}/pub/player/{}/stats", self.api_url, username);

        let resp = match self.client.get(&url).header(ACCEPT, "application/json").send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::warn!(%username, status = %resp.status(), "Chess.com stats unavailable");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(%username, "Chess.com stats request failed: {e}");
                return Vec::new();
            }
        };

        match resp.json::<Value>().await {
            Ok(stats) => parse_stats(&stats, chrono::Utc::now().date_naive()),
            Err(e) => {
                tracing::warn!(%username, "Chess.com stats are not JSON: {e}");
                Vec::new()
            }
        }
    }

    async fn fetch_archive(&self, archive_url: String) -> (String, Result<Vec<String>, FetchError>) {
        let result = self.read_archive(&archive_url).await;
        (archive_url, result)
    }

    async fn read_archive(&self, archive_url: &str) -> Result<Vec<String>, FetchError> {
        let resp = self
            .client
            .get(archive_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| request_error(PLATFORM, e))?;
        if !resp.status().is_success() {
            return Err(status_error(PLATFORM, resp.status()));
        }
        let data: Value = resp.json().await.map_err(|e| FetchError::Malformed {
            platform: PLATFORM,
            reason: format!("archive is not JSON: {e}"),
        })?;
        Ok(archive_games(&data))
    }

    async fn get_text(&self, url: &str, accept: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| request_error(PLATFORM, e))?;
        if !resp.status().is_success() {
            return Err(status_error(PLATFORM, resp.status()));
        }
        resp.text().await.map_err(|e| request_error(PLATFORM, e))
    }

    async fn try_pgn_text(&self, url: &str, accept: &str) -> Option<String> {
        match self.get_text(url, accept).await {
            Ok(text) if has_pgn_marker(text.trim()) => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::debug!(%url, "Response is not a PGN");
                None
            }
            Err(e) => {
                tracing::debug!(%url, "PGN source failed: {e}");
                None
            }
        }
    }
}

fn archive_games(data: &Value) -> Vec<String> {
    data["games"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|game| game.get("pgn").and_then(Value::as_str))
        .map(str::trim)
        .filter(|pgn| !pgn.is_empty())
        .map(String::from)
        .collect()
}

fn parse_stats(stats: &Value, today: chrono::NaiveDate) -> Vec<RatingPoint> {
    STATS_VARIANTS
        .iter()
        .filter_map(|(key, variant)| {
            let rating = stats[*key]["last"]["rating"].as_i64()?;
            let rating = i32::try_from(rating).ok().filter(|r| *r > 0)?;
            Some(RatingPoint {
                date: today,
                rating,
                variant: *variant,
            })
        })
        .collect()
}

/// Undo JavaScript string escaping. Valid JSON escapes go through serde;
/// anything else gets the common replacements.
fn decode_js_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| {
        raw.replace("\\n", "\n")
            .replace("\\\"", "\"")
            .replace("\\'", "'")
    })
}

/// Pull a PGN out of a game page's markup.
pub fn extract_pgn_from_html(html: &str) -> Option<String> {
    for re in EMBEDDED_OBJECT_RES.iter() {
        let Some(object) = re.captures(html).and_then(|c| c.get(1)) else {
            continue;
        };
        let pgn = serde_json::from_str::<Value>(object.as_str())
            .ok()
            .and_then(|data| data.get("pgn").and_then(Value::as_str).map(|p| p.trim().to_string()));
        if let Some(pgn) = pgn.filter(|p| !p.is_empty()) {
            return Some(pgn);
        }
    }

    for re in [&*DOUBLE_QUOTED_PGN_RE, &*SINGLE_QUOTED_PGN_RE] {
        if let Some(raw) = re.captures(html).and_then(|c| c.get(1)) {
            let pgn = decode_js_string(raw.as_str());
            if has_pgn_marker(&pgn) {
                return Some(pgn.trim().to_string());
            }
        }
    }

    let block = TAG_BLOCK_RE.captures(html)?.get(1)?.as_str().trim();
    (block.contains("[Event") && block.len() > 50).then(|| block.to_string())
}
