//! Arrows and highlights for a selected mistake, key moment or ply.
//!
//! Every function here is pure: the same game and selection always produce
//! the same view, rebuilt from the initial position.

use serde::Serialize;
use shakmaty::{Chess, File, Position, Rank, Square};

use crate::game_data::GameRecord;
use crate::replay::{self, BoardState, LocatedMove, MoveContext, ReplayAnomaly};
use crate::report::{KeyMoment, Mistake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticColor {
    PlayedBad,
    SuggestedGood,
    KeyPositive,
    KeyNegative,
    Threat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub from_square: String,
    pub to_square: String,
    pub semantic_color: SemanticColor,
}

impl Annotation {
    fn new(from: Square, to: Square, semantic_color: SemanticColor) -> Self {
        Self {
            from_square: from.to_string(),
            to_square: to.to_string(),
            semantic_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSummary {
    pub from_square: String,
    pub to_square: String,
    pub san: String,
}

impl From<&LocatedMove> for MoveSummary {
    fn from(m: &LocatedMove) -> Self {
        Self {
            from_square: m.from.to_string(),
            to_square: m.to.to_string(),
            san: m.san.clone(),
        }
    }
}

/// Everything the board needs to render one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayView {
    pub fen_before: String,
    pub fen_after: String,
    /// Ply of the highlighted move, when one was located.
    pub ply: Option<usize>,
    pub played_move: Option<MoveSummary>,
    pub best_move: Option<MoveSummary>,
    pub annotations: Vec<Annotation>,
    pub anomalies: Vec<ReplayAnomaly>,
    pub total_plies: usize,
}

impl ReplayView {
    fn unresolved(game: &GameRecord, board: BoardState) -> Self {
        let fen = board.fen();
        Self {
            fen_before: fen.clone(),
            fen_after: fen,
            ply: None,
            played_move: None,
            best_move: None,
            annotations: Vec::new(),
            anomalies: board.anomalies().to_vec(),
            total_plies: game.ply_count(),
        }
    }

    fn from_context(game: &GameRecord, ctx: &MoveContext) -> Self {
        Self {
            fen_before: ctx.before.fen(),
            fen_after: replay::fen_of(&ctx.after()),
            ply: Some(ctx.ply),
            played_move: Some(MoveSummary::from(&ctx.played)),
            best_move: None,
            annotations: Vec::new(),
            anomalies: ctx.before.anomalies().to_vec(),
            total_plies: game.ply_count(),
        }
    }
}

/// Arrows for a played move and, optionally, a suggested move.
///
/// With an evaluation change the played move is a key moment and is colored
/// by the sign of the change; otherwise it is a mistake.
pub fn annotate(
    played: &LocatedMove,
    suggested: Option<&LocatedMove>,
    evaluation_change: Option<i32>,
) -> Vec<Annotation> {
    let played_color = match evaluation_change {
        Some(change) if change > 0 => SemanticColor::KeyPositive,
        Some(_) => SemanticColor::KeyNegative,
        None => SemanticColor::PlayedBad,
    };

    let mut annotations = vec![Annotation::new(played.from, played.to, played_color)];
    if let Some(best) = suggested {
        annotations.push(Annotation::new(best.from, best.to, SemanticColor::SuggestedGood));
    }
    annotations
}

/// Enemy pieces that can legally reach the destination of `played` once it
/// has been made on `before`.
pub fn threats(before: &Chess, played: &LocatedMove) -> Vec<Annotation> {
    let mut after = before.clone();
    after.play_unchecked(played.mv.clone());

    let Some(mover) = after.board().piece_at(played.to).map(|p| p.color) else {
        return Vec::new();
    };

    let legals = after.legal_moves();
    let mut annotations = Vec::new();
    for index in 0..64u32 {
        let square = Square::from_coords(File::new(index % 8), Rank::new(index / 8));
        let Some(piece) = after.board().piece_at(square) else {
            continue;
        };
        if piece.color == mover {
            continue;
        }
        let attacks = legals
            .iter()
            .any(|mv| mv.from() == Some(square) && mv.to() == played.to);
        if attacks {
            annotations.push(Annotation::new(square, played.to, SemanticColor::Threat));
        }
    }
    annotations
}

/// Position before a reported mistake with its arrow and, when
/// `show_solution` is set and the suggestion resolves, the better move.
pub fn mistake_view(game: &GameRecord, mistake: &Mistake, show_solution: bool) -> ReplayView {
    let Some(ctx) = replay::ply_for_played_move(game, mistake.move_number, &mistake.move_played)
        .and_then(|ply| replay::move_context(game, ply))
    else {
        return ReplayView::unresolved(game, replay::position_before_move(game, mistake.move_number));
    };

    let best = show_solution
        .then(|| mistake.best_suggestion.as_deref())
        .flatten()
        .and_then(|text| replay::resolve_suggestion(ctx.before.position(), text));

    let mut view = ReplayView::from_context(game, &ctx);
    view.annotations = annotate(&ctx.played, best.as_ref(), None);
    view.best_move = best.as_ref().map(MoveSummary::from);
    view
}

/// Position before a key moment with its move colored by the evaluation swing.
pub fn key_moment_view(game: &GameRecord, moment: &KeyMoment) -> ReplayView {
    let Some(ctx) = replay::white_ply(moment.move_number).and_then(|ply| replay::move_context(game, ply))
    else {
        return ReplayView::unresolved(game, replay::position_before_move(game, moment.move_number));
    };

    let mut view = ReplayView::from_context(game, &ctx);
    view.annotations = annotate(&ctx.played, None, Some(moment.evaluation_change));
    view
}

/// Key moments whose swing stays within this many centipawns are not marked
/// in the step-through view.
pub const KEY_MOMENT_THRESHOLD: i32 = 50;

/// Step-through view: the position after `ply`. A mistake reported for that
/// ply's move number adds its arrow, the pieces threatening the moved piece
/// and, with `show_solution`, the suggested move. Otherwise a key moment with
/// a swing beyond [`KEY_MOMENT_THRESHOLD`] colors the move.
pub fn ply_view(
    game: &GameRecord,
    ply: usize,
    mistakes: &[Mistake],
    key_moments: &[KeyMoment],
    show_solution: bool,
) -> ReplayView {
    let Some(last) = game.ply_count().checked_sub(1) else {
        return ReplayView::unresolved(game, BoardState::initial());
    };
    let ply = ply.min(last);

    let Some(ctx) = replay::move_context(game, ply) else {
        let mut view = ReplayView::unresolved(game, replay::replay_plies(game, ply + 1));
        view.ply = Some(ply);
        return view;
    };

    let mut view = ReplayView::from_context(game, &ctx);
    let move_number = replay::move_number_for_ply(ply);
    if let Some(mistake) = mistakes.iter().find(|m| m.move_number == move_number) {
        let best = show_solution
            .then(|| mistake.best_suggestion.as_deref())
            .flatten()
            .and_then(|text| replay::resolve_suggestion(ctx.before.position(), text));

        view.annotations = vec![Annotation::new(ctx.played.from, ctx.played.to, SemanticColor::PlayedBad)];
        view.annotations.extend(threats(ctx.before.position(), &ctx.played));
        if let Some(best) = &best {
            view.annotations.push(Annotation::new(best.from, best.to, SemanticColor::SuggestedGood));
        }
        view.best_move = best.as_ref().map(MoveSummary::from);
    } else if let Some(moment) = key_moments
        .iter()
        .find(|k| k.move_number == move_number && k.evaluation_change.abs() > KEY_MOMENT_THRESHOLD)
    {
        view.annotations = annotate(&ctx.played, None, Some(moment.evaluation_change));
    }
    view
}
