pub mod exercise;
pub mod game_analyze;
pub mod health;
pub mod opponent_analyze;
pub mod replay;

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor whose rejections use the `{"error": ...}` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
