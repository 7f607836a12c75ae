//! Move replay: rebuild board states from a game's SAN tokens.
//!
//! Every lookup replays from the initial position. Move number `n` covers
//! plies `2(n-1)` (White) and `2(n-1)+1` (Black); the position "before move
//! n" is the one reached after `2(n-1)` plies.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, File, Move, Position, Rank, Square};

use crate::game_data::GameRecord;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:best(?:\s+move)?|meilleur(?:\s+coup)?|solution)\s*:?\s*").unwrap()
});
static MOVE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s*\.+\s*").unwrap());
static SQUARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-h][1-8]").unwrap());

/// A SAN token that could not be applied during replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayAnomaly {
    pub ply: usize,
    pub san: String,
}

/// A position reached by replaying the first `plies_replayed` tokens.
#[derive(Debug, Clone)]
pub struct BoardState {
    position: Chess,
    plies_replayed: usize,
    anomalies: Vec<ReplayAnomaly>,
}

impl BoardState {
    pub fn initial() -> Self {
        Self {
            position: Chess::default(),
            plies_replayed: 0,
            anomalies: Vec::new(),
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn plies_replayed(&self) -> usize {
        self.plies_replayed
    }

    /// Tokens skipped because they did not apply to the position at the time.
    pub fn anomalies(&self) -> &[ReplayAnomaly] {
        &self.anomalies
    }

    pub fn fen(&self) -> String {
        fen_of(&self.position)
    }
}

impl PartialEq for BoardState {
    fn eq(&self, other: &Self) -> bool {
        self.plies_replayed == other.plies_replayed
            && self.anomalies == other.anomalies
            && self.fen() == other.fen()
    }
}

/// A move resolved against a concrete position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedMove {
    pub mv: Move,
    pub from: Square,
    pub to: Square,
    pub san: String,
}

impl LocatedMove {
    fn new(position: &Chess, mv: Move) -> Option<Self> {
        // Standard castling mode reports the king's destination, not the rook.
        let (from, to) = match mv.to_uci(CastlingMode::Standard) {
            UciMove::Normal { from, to, .. } => (from, to),
            _ => return None,
        };
        let san = SanPlus::from_move(position.clone(), mv.clone()).to_string();
        Some(Self { mv, from, to, san })
    }
}

/// The position before a given ply and the move played from it.
#[derive(Debug, Clone)]
pub struct MoveContext {
    pub ply: usize,
    pub before: BoardState,
    pub played: LocatedMove,
}

impl MoveContext {
    pub fn after(&self) -> Chess {
        let mut position = self.before.position().clone();
        position.play_unchecked(self.played.mv.clone());
        position
    }
}

pub fn fen_of(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

fn parse_san(position: &Chess, text: &str) -> Option<Move> {
    let san: SanPlus = text.trim().parse().ok()?;
    san.san.to_move(position).ok()
}

/// Replay the first `plies` tokens (clamped to the game length).
///
/// Tokens that do not apply are recorded as anomalies and skipped.
pub fn replay_plies(game: &GameRecord, plies: usize) -> BoardState {
    let target = plies.min(game.moves.len());
    let mut position = Chess::default();
    let mut anomalies = Vec::new();

    for (ply, san) in game.moves.iter().take(target).enumerate() {
        match parse_san(&position, san) {
            Some(mv) => position.play_unchecked(mv),
            None => {
                tracing::warn!(ply, san = %san, "Skipping SAN token that does not apply");
                anomalies.push(ReplayAnomaly {
                    ply,
                    san: san.clone(),
                });
            }
        }
    }

    BoardState {
        position,
        plies_replayed: target,
        anomalies,
    }
}

/// Zero-based ply of White's move for move number `n` (`None` for `n == 0`).
pub fn white_ply(move_number: u32) -> Option<usize> {
    let n = usize::try_from(move_number).ok()?;
    n.checked_sub(1).map(|k| 2 * k)
}

pub fn move_number_for_ply(ply: usize) -> u32 {
    u32::try_from(ply / 2 + 1).unwrap_or(u32::MAX)
}

/// Ply index reached when jumping to move `n`: after Black's reply, clamped to
/// the last ply of the game.
pub fn ply_for_move_number(move_number: u32, total_plies: usize) -> Option<usize> {
    let last = total_plies.checked_sub(1)?;
    let white = white_ply(move_number)?;
    Some((white + 1).min(last))
}

pub fn position_before_move(game: &GameRecord, move_number: u32) -> BoardState {
    replay_plies(game, white_ply(move_number).unwrap_or(0))
}

pub fn position_after_move(game: &GameRecord, move_number: u32) -> BoardState {
    replay_plies(game, white_ply(move_number).map_or(0, |ply| ply + 2))
}

fn same_move_text(a: &str, b: &str) -> bool {
    let clean = |s: &str| {
        s.trim()
            .trim_end_matches(['+', '#', '!', '?'])
            .to_string()
    };
    !a.trim().is_empty() && clean(a) == clean(b)
}

/// Ply a reported move refers to: White's ply for move `n`, unless only
/// Black's ply matches `played_san`.
pub fn ply_for_played_move(game: &GameRecord, move_number: u32, played_san: &str) -> Option<usize> {
    let white = white_ply(move_number).filter(|&ply| ply < game.moves.len())?;
    let black = white + 1;
    let black_matches = game
        .moves
        .get(black)
        .is_some_and(|san| same_move_text(played_san, san));
    if black_matches && !same_move_text(played_san, &game.moves[white]) {
        Some(black)
    } else {
        Some(white)
    }
}

/// Position before `ply` plus the move played there, if that token applies.
pub fn move_context(game: &GameRecord, ply: usize) -> Option<MoveContext> {
    let token = game.moves.get(ply)?;
    let before = replay_plies(game, ply);
    let mv = parse_san(before.position(), token)?;
    let played = LocatedMove::new(before.position(), mv)?;
    Some(MoveContext { ply, before, played })
}

/// Origin and destination of the reported move, or `None` when the move
/// number is out of range or its token does not apply.
pub fn locate_move(game: &GameRecord, move_number: u32, played_san: &str) -> Option<LocatedMove> {
    let ply = ply_for_played_move(game, move_number, played_san)?;
    move_context(game, ply).map(|ctx| ctx.played)
}

fn squares_file_major() -> impl Iterator<Item = Square> {
    (0..8u32).flat_map(|file| {
        (0..8u32).map(move |rank| Square::from_coords(File::new(file), Rank::new(rank)))
    })
}

/// Resolve a free-text move suggestion against `position`.
///
/// Tries the text verbatim, then with labels and move numbers stripped (as
/// written, lowercased, uppercased), then the first legal move landing on the
/// last square named in the text, scanning origins a1, a2, ..., h8.
pub fn resolve_suggestion(position: &Chess, suggestion: &str) -> Option<LocatedMove> {
    if let Some(mv) = parse_san(position, suggestion) {
        return LocatedMove::new(position, mv);
    }

    let cleaned = LABEL_RE.replace(suggestion.trim(), "");
    let cleaned = MOVE_NUMBER_RE.replace(cleaned.trim(), "");
    let cleaned = cleaned.trim().trim_end_matches(['!', '?', '.']);

    for candidate in [cleaned.to_string(), cleaned.to_lowercase(), cleaned.to_uppercase()] {
        if let Some(mv) = parse_san(position, &candidate) {
            return LocatedMove::new(position, mv);
        }
    }

    let target_name = SQUARE_RE.find_iter(cleaned).last()?.as_str();
    let target: Square = target_name.parse().ok()?;
    let legals: Vec<LocatedMove> = position
        .legal_moves()
        .into_iter()
        .filter_map(|mv| LocatedMove::new(position, mv))
        .filter(|located| located.to == target)
        .collect();

    squares_file_major().find_map(|origin| legals.iter().find(|m| m.from == origin).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHOLARS_MATE: &str = "[Event \"Casual\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0";

    fn game(pgn: &str) -> GameRecord {
        GameRecord::from_pgn(pgn)
    }

    fn apply(state: &BoardState, sans: &[&str]) -> String {
        let mut position = state.position().clone();
        for san in sans {
            let mv = parse_san(&position, san).unwrap();
            position.play_unchecked(mv);
        }
        fen_of(&position)
    }

    #[test]
    fn before_move_one_is_initial_position() {
        let g = game(SCHOLARS_MATE);
        assert_eq!(position_before_move(&g, 1).fen(), BoardState::initial().fen());
        assert_eq!(position_before_move(&g, 1).plies_replayed(), 0);
    }

    #[test]
    fn before_move_n_replays_two_n_minus_two_plies() {
        let g = game(SCHOLARS_MATE);
        let state = position_before_move(&g, 3);
        assert_eq!(state.plies_replayed(), 4);
        assert_eq!(
            state.fen(),
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/8/PPPP1PPP/RNBQK1NR w KQkq - 2 3"
        );
    }

    #[test]
    fn after_is_before_plus_two_plies() {
        let g = game(SCHOLARS_MATE);
        for n in 1..=3 {
            let before = position_before_move(&g, n);
            let after = position_after_move(&g, n);
            let white = white_ply(n).unwrap();
            let expected = apply(&before, &[&g.moves[white], &g.moves[white + 1]]);
            assert_eq!(after.fen(), expected, "move {n}");
        }
    }

    #[test]
    fn after_last_move_clamps_to_game_length() {
        let g = game(SCHOLARS_MATE);
        let after = position_after_move(&g, 4);
        assert_eq!(after.plies_replayed(), 7);
        assert!(after.position().is_checkmate());
    }

    #[test]
    fn replay_is_restartable() {
        let g = game(SCHOLARS_MATE);
        let first = position_before_move(&g, 3);
        let second = position_before_move(&g, 3);
        assert_eq!(first, second);
        assert_eq!(first.fen(), second.fen());
    }

    #[test]
    fn illegal_token_does_not_block_later_moves() {
        let g = GameRecord {
            raw_pgn: String::new(),
            moves: vec!["e4", "e5", "Ke3", "Nf3", "Nc6"]
                .into_iter()
                .map(String::from)
                .collect(),
            result_tag: "*".into(),
        };
        let state = replay_plies(&g, 5);
        assert_eq!(state.anomalies().len(), 1);
        assert_eq!(state.anomalies()[0].ply, 2);
        assert_eq!(
            state.fen(),
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3"
        );
    }

    #[test]
    fn locate_move_reports_squares() {
        let g = game(SCHOLARS_MATE);
        let located = locate_move(&g, 3, "Qh5").unwrap();
        assert_eq!(located.from, Square::D1);
        assert_eq!(located.to, Square::H5);
        assert_eq!(located.san, "Qh5");
    }

    #[test]
    fn locate_move_picks_black_ply_when_san_matches() {
        let g = game(SCHOLARS_MATE);
        let located = locate_move(&g, 3, "Nf6").unwrap();
        assert_eq!(located.from, Square::G8);
        assert_eq!(located.to, Square::F6);
    }

    #[test]
    fn locate_move_out_of_range_is_none() {
        let g = game(SCHOLARS_MATE);
        assert!(locate_move(&g, 0, "e4").is_none());
        assert!(locate_move(&g, 40, "e4").is_none());
    }

    #[test]
    fn castling_reports_king_destination() {
        let g = game("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O Nf6");
        let located = locate_move(&g, 4, "O-O").unwrap();
        assert_eq!(located.from, Square::E1);
        assert_eq!(located.to, Square::G1);
    }

    #[test]
    fn suggestion_parses_verbatim() {
        let position = Chess::default();
        let m = resolve_suggestion(&position, "Nf3").unwrap();
        assert_eq!((m.from, m.to), (Square::G1, Square::F3));
    }

    #[test]
    fn suggestion_strips_labels_and_move_numbers() {
        let position = Chess::default();
        let m = resolve_suggestion(&position, "Best: Nf3").unwrap();
        assert_eq!(m.to, Square::F3);
        let m = resolve_suggestion(&position, "Solution : 1. e4!").unwrap();
        assert_eq!((m.from, m.to), (Square::E2, Square::E4));
    }

    #[test]
    fn suggestion_falls_back_to_destination_square() {
        let position = Chess::default();
        let m = resolve_suggestion(&position, "push the king pawn to e4").unwrap();
        assert_eq!((m.from, m.to), (Square::E2, Square::E4));
    }

    #[test]
    fn square_fallback_prefers_file_major_order() {
        // Both knights can reach d2 after 1. d4 d5 2. e3 e6 3. Bd3 Bd6 4. c3 c6
        let g = game("1. d4 d5 2. e3 e6 3. Bd3 Bd6 4. c3 c6");
        let state = replay_plies(&g, 8);
        let m = resolve_suggestion(state.position(), "a knight belongs on d2").unwrap();
        assert_eq!(m.from, Square::B1);
        assert_eq!(m.to, Square::D2);
    }

    #[test]
    fn unresolvable_suggestion_is_none() {
        let position = Chess::default();
        assert!(resolve_suggestion(&position, "keep calm and improve").is_none());
        assert!(resolve_suggestion(&position, "").is_none());
        // e5 is not reachable from the initial position
        assert!(resolve_suggestion(&position, "something on e5").is_none());
    }

    #[test]
    fn ply_navigation_clamps() {
        assert_eq!(ply_for_move_number(1, 7), Some(1));
        assert_eq!(ply_for_move_number(4, 7), Some(6));
        assert_eq!(ply_for_move_number(9, 7), Some(6));
        assert_eq!(ply_for_move_number(1, 0), None);
        assert_eq!(move_number_for_ply(0), 1);
        assert_eq!(move_number_for_ply(5), 3);
    }
}
