//! Checking a move submitted for an opponent exercise.

use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Move, Position};
use thiserror::Error;

use crate::replay::fen_of;
use crate::report::MoveVariant;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExerciseError {
    #[error("Invalid exercise position: {0}")]
    InvalidFen(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOutcome {
    pub legal: bool,
    pub san: Option<String>,
    pub variant: Option<MoveVariant>,
    pub is_best: Option<bool>,
    pub completed: bool,
    pub fen_after: Option<String>,
    pub opponent_reply: Option<String>,
}

impl ExerciseOutcome {
    fn illegal() -> Self {
        Self {
            legal: false,
            san: None,
            variant: None,
            is_best: None,
            completed: false,
            fen_after: None,
            opponent_reply: None,
        }
    }
}

/// Lowercase and drop check, mate and promotion markers.
pub fn normalize_move(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '+' | '#' | '='))
        .collect()
}

/// Variant matching the played move: an exact normalized match wins,
/// otherwise the first variant whose text contains, or is contained in, the
/// played move.
///
/// Containment is deliberately loose ("f3" also matches "Nf3").
pub fn find_variant<'a>(variants: &'a [MoveVariant], played_san: &str) -> Option<&'a MoveVariant> {
    let played = normalize_move(played_san);
    if played.is_empty() {
        return None;
    }
    let candidates = || {
        variants
            .iter()
            .map(|v| (v, normalize_move(&v.mv)))
            .filter(|(_, text)| !text.is_empty())
    };

    candidates()
        .find(|(_, text)| *text == played)
        .or_else(|| candidates().find(|(_, text)| text.contains(&played) || played.contains(text.as_str())))
        .map(|(variant, _)| variant)
}

/// True when `played_san` is the last move of the solution line.
pub fn completes_solution(solution: &[String], played_san: &str) -> bool {
    let played = normalize_move(played_san);
    solution
        .iter()
        .position(|step| normalize_move(step) == played)
        .is_some_and(|index| index + 1 == solution.len())
}

fn parse_move(position: &Chess, input: &str) -> Option<Move> {
    let input = input.trim();
    if let Some(mv) = input
        .parse::<SanPlus>()
        .ok()
        .and_then(|san| san.san.to_move(position).ok())
    {
        return Some(mv);
    }

    let uci = |text: &str| {
        text.parse::<UciMove>()
            .ok()
            .and_then(|uci| uci.to_move(position).ok())
    };
    // Board drops carry no promotion piece; promote to a queen.
    uci(input).or_else(|| (input.len() == 4).then(|| uci(&format!("{input}q"))).flatten())
}

/// Play `input` (SAN or UCI) on the exercise position and grade it against
/// the exercise's variants and solution line.
pub fn check_move(
    position_fen: &str,
    input: &str,
    variants: &[MoveVariant],
    solution: &[String],
) -> Result<ExerciseOutcome, ExerciseError> {
    let position: Chess = position_fen
        .trim()
        .parse::<Fen>()
        .map_err(|e| ExerciseError::InvalidFen(e.to_string()))?
        .into_position(CastlingMode::Standard)
        .map_err(|e| ExerciseError::InvalidFen(e.to_string()))?;

    let Some(mv) = parse_move(&position, input) else {
        return Ok(ExerciseOutcome::illegal());
    };

    let mut after = position;
    let san = SanPlus::from_move_and_play_unchecked(&mut after, mv).to_string();

    let variant = find_variant(variants, &san).cloned();
    let is_best = variant.as_ref().map(|v| v.is_best);
    let mut completed = false;
    let mut opponent_reply = None;

    if let Some(v) = variant.as_ref().filter(|v| v.is_best) {
        match v.opponent_response.as_deref() {
            Some(response) => {
                if let Some(reply) = parse_move(&after, response) {
                    opponent_reply = Some(SanPlus::from_move_and_play_unchecked(&mut after, reply).to_string());
                } else {
                    tracing::warn!(response = %response, "Opponent response is not legal in the exercise line");
                }
            }
            None => completed = completes_solution(solution, &san),
        }
    }

    Ok(ExerciseOutcome {
        legal: true,
        san: Some(san),
        variant,
        is_best,
        completed,
        fen_after: Some(fen_of(&after)),
        opponent_reply,
    })
}
