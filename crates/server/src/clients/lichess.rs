use chess_core::pgn::has_pgn_marker;
use chrono::NaiveDate;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

use super::{request_error, status_error, FetchError, RatingPoint, RatingVariant};

pub const PLATFORM: &str = "Lichess";

/// Lichess game IDs are 8 characters; links shared by a player append four
/// more that identify their side.
const GAME_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct LichessClient {
    client: Client,
    base_url: String,
}

impl LichessClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Export one game as PGN.
    pub async fn fetch_game_pgn(&self, game_id: &str) -> Result<String, FetchError> {
        let game_id = game_id.get(..GAME_ID_LEN).unwrap_or(game_id);
        let url = format!("{}/game/export/{}", self.base_url, game_id);
        tracing::info!(%game_id, "Fetching Lichess game");

        let resp = self
            .client
            .get(&url)
            .query(&[("moves", "true"), ("pgnInJson", "false")])
            .header(ACCEPT, "application/x-chess-pgn")
            .send()
            .await
            .map_err(|e| request_error(PLATFORM, e))?;

        if !resp.status().is_success() {
            tracing::warn!(%game_id, status = %resp.status(), "Lichess export failed");
            return Err(status_error(PLATFORM, resp.status()));
        }

        let text = resp.text().await.map_err(|e| request_error(PLATFORM, e))?;
        let pgn = text.trim();
        if pgn.is_empty() || !has_pgn_marker(pgn) {
            return Err(FetchError::Malformed {
                platform: PLATFORM,
                reason: "export did not return a PGN".to_string(),
            });
        }
        Ok(pgn.to_string())
    }

    /// Most recent games of a user, newest first, at most `count`.
    ///
    /// The export is streamed as NDJSON; reading stops as soon as `count`
    /// games have been collected.
    pub async fn fetch_user_games(&self, username: &str, count: usize) -> Result<Vec<String>, FetchError> {
        let username = username.trim().to_lowercase();
        let url = format!("{}/api/games/user/{}", self.base_url, username);
        tracing::info!(%username, count, "Fetching Lichess games");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("max", count.to_string()),
                ("moves", "false".to_string()),
                ("pgnInJson", "true".to_string()),
            ])
            .header(ACCEPT, "application/x-ndjson")
            .send()
            .await
            .map_err(|e| request_error(PLATFORM, e))?;

        if !resp.status().is_success() {
            return Err(status_error(PLATFORM, resp.status()));
        }

        let mut games = Vec::new();
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) if games.is_empty() => return Err(request_error(PLATFORM, e)),
                Err(e) => {
                    tracing::warn!("Lichess stream interrupted after {} games: {e}", games.len());
                    break;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(pgn) = parse_game_line(&line) {
                    games.push(pgn);
                    if games.len() >= count {
                        break 'read;
                    }
                }
            }
        }

        if games.len() < count {
            if let Some(pgn) = parse_game_line(&buffer) {
                games.push(pgn);
            }
        }

        if games.is_empty() {
            return Err(FetchError::NoGamesFound { platform: PLATFORM });
        }
        games.truncate(count);
        Ok(games)
    }

    /// Monthly rating points across time controls, oldest first. Never fails:
    /// any upstream problem yields an empty series.
    pub async fn fetch_rating_history(&self, username: &str) -> Vec<RatingPoint> {
        let username = username.trim().to_lowercase();
        let url = format!("{}/api/user/{}/rating-history", self.base_url, username);

        let resp = match self.client.get(&url).header(ACCEPT, "application/json").send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::warn!(%username, status = %resp.status(), "Lichess rating history unavailable");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(%username, "Lichess rating history request failed: {e}");
                return Vec::new();
            }
        };

        match resp.json::<Value>().await {
            Ok(data) => parse_rating_history(&data),
            Err(e) => {
                tracing::warn!(%username, "Lichess rating history is not JSON: {e}");
                Vec::new()
            }
        }
    }
}

/// One NDJSON record; `None` for blank lines, bad JSON or records without a PGN.
fn parse_game_line(line: &[u8]) -> Option<String> {
    let line = std::str::from_utf8(line).ok()?.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(game) => game
            .get("pgn")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|pgn| !pgn.is_empty())
            .map(String::from),
        Err(e) => {
            tracing::warn!("Skipping malformed Lichess game record: {e}");
            None
        }
    }
}

fn variant_for(name: &str) -> Option<RatingVariant> {
    match name.to_lowercase().as_str() {
        "ultrabullet" => Some(RatingVariant::UltraBullet),
        "bullet" => Some(RatingVariant::Bullet),
        "blitz" => Some(RatingVariant::Blitz),
        "rapid" => Some(RatingVariant::Rapid),
        "classical" => Some(RatingVariant::Classical),
        "correspondence" => Some(RatingVariant::Correspondence),
        _ => None,
    }
}

/// Points are `[year, zero-based month, day, rating]`; the day is dropped
/// and every point is dated the first of its month.
fn parse_rating_history(data: &Value) -> Vec<RatingPoint> {
    let mut points = Vec::new();
    for perf in data.as_array().into_iter().flatten() {
        let Some(variant) = perf.get("name").and_then(Value::as_str).and_then(variant_for) else {
            continue;
        };
        for point in perf.get("points").and_then(Value::as_array).into_iter().flatten() {
            let Some(fields) = point.as_array().filter(|f| f.len() >= 4) else {
                continue;
            };
            let number = |i: usize| fields[i].as_i64();
            let (Some(year), Some(month), Some(rating)) = (number(0), number(1), number(3)) else {
                continue;
            };
            let date = i32::try_from(year)
                .ok()
                .zip(u32::try_from(month + 1).ok())
                .and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1));
            if let (Some(date), Ok(rating)) = (date, i32::try_from(rating)) {
                points.push(RatingPoint { date, rating, variant });
            }
        }
    }
    points.sort_by_key(|p| p.date);
    points
}
