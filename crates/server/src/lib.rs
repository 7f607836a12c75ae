pub mod clients;
pub mod config;
pub mod error;
pub mod prompts;
pub mod routes;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use clients::chess_com::ChessComClient;
use clients::lichess::LichessClient;
use clients::openai::OpenAiClient;
use config::Config;

/// Build the router with clients for the configured upstreams.
pub fn app(config: &Config) -> reqwest::Result<Router> {
    let platform_http = clients::http_client(config.upstream_timeout)?;
    let llm_http = clients::http_client(config.llm_timeout)?;

    let lichess = LichessClient::new(platform_http.clone(), &config.lichess_base_url);
    let chess_com = ChessComClient::new(platform_http, &config.chess_com_web_url, &config.chess_com_api_url);
    let llm = OpenAiClient::new(
        llm_http,
        config.openai_api_key.clone(),
        &config.openai_base_url,
        &config.openai_model,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/game-analyze", post(routes::game_analyze::analyze_game))
        .route("/api/opponent-analyze", post(routes::opponent_analyze::analyze_opponent))
        .route("/api/game-replay", post(routes::replay::replay_selection))
        .route("/api/exercise/check", post(routes::exercise::check_exercise_move))
        .layer(Extension(lichess))
        .layer(Extension(chess_com))
        .layer(Extension(llm))
        .layer(CompressionLayer::new())
        .layer(cors))
}
