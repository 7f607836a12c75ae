//! Chess domain logic for game and opponent analysis: PGN parsing, move
//! replay, board annotations and validation of generated reports.

pub mod annotate;
pub mod exercise;
pub mod game_data;
pub mod pgn;
pub mod replay;
pub mod report;
