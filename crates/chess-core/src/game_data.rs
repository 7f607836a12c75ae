use serde::{Deserialize, Serialize};

use crate::pgn;

/// A game as fetched or pasted: the raw PGN plus the SAN tokens of its mainline.
///
/// `moves` is always derived from `raw_pgn`; build records through
/// [`GameRecord::from_pgn`] so the two never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub raw_pgn: String,
    pub moves: Vec<String>, // SAN tokens, ply order
    pub result_tag: String, // "1-0", "0-1", "1/2-1/2" or "*"
}

impl GameRecord {
    pub fn from_pgn(raw_pgn: &str) -> Self {
        let raw_pgn = raw_pgn.trim().to_string();
        let moves = pgn::extract_moves(&raw_pgn);
        let result_tag = pgn::extract_header(&raw_pgn, "Result").unwrap_or_else(|| "*".to_string());
        Self {
            raw_pgn,
            moves,
            result_tag,
        }
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    /// Number of full moves in the game (a trailing White move counts as one).
    pub fn move_count(&self) -> usize {
        self.moves.len().div_ceil(2)
    }
}
