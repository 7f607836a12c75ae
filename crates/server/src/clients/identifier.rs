//! Classify a user-supplied link, bare game ID or profile URL.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static LICHESS_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{8,}$").unwrap());
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Lichess,
    ChessCom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    GameLink,
    Username,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub platform: Platform,
    pub kind: IdentifierKind,
    /// Game ID or username.
    pub value: String,
    /// Path of the submitted link (empty for a bare ID).
    pub path: String,
}

impl Identifier {
    fn new(platform: Platform, kind: IdentifierKind, value: &str, path: &str) -> Self {
        Self {
            platform,
            kind,
            value: value.to_string(),
            path: path.to_string(),
        }
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.strip_suffix(domain).is_some_and(|rest| rest.ends_with('.'))
}

/// `None` means the input names neither platform; callers report it as a
/// validation error.
pub fn classify(input: &str) -> Option<Identifier> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if LICHESS_ID_RE.is_match(input) {
        return Some(Identifier::new(Platform::Lichess, IdentifierKind::GameLink, input, ""));
    }

    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path();
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if host_matches(&host, "lichess.org") {
        return match parts.as_slice() {
            ["@", user, ..] => Some(Identifier::new(Platform::Lichess, IdentifierKind::Username, user, path)),
            [id, ..] if LICHESS_ID_RE.is_match(id) => {
                Some(Identifier::new(Platform::Lichess, IdentifierKind::GameLink, id, path))
            }
            _ => None,
        };
    }

    if host_matches(&host, "chess.com") {
        let game_id = match parts.as_slice() {
            ["game", "live" | "daily" | "view", id, ..] => Some(*id),
            ["analysis", "game", "live", id, ..] => Some(*id),
            ["member", user, ..] => {
                return Some(Identifier::new(Platform::ChessCom, IdentifierKind::Username, user, path));
            }
            _ => None,
        };
        return game_id
            .filter(|id| NUMERIC_RE.is_match(id))
            .map(|id| Identifier::new(Platform::ChessCom, IdentifierKind::GameLink, id, path));
    }

    None
}
