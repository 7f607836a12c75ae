#![allow(dead_code)]

use std::time::Duration;

use axum::{routing::post, Json, Router};
use reqwest::Client;
use serde_json::{json, Value};
use server::config::Config;

/// Serve a router on an ephemeral local port. `build` receives the base URL
/// so handlers can hand out absolute links to themselves.
pub async fn spawn_upstream<F>(build: F) -> String
where
    F: FnOnce(String) -> Router,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    let router = build(base.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    base
}

/// Config pointing every upstream at `upstream`.
pub fn config_for(upstream: &str) -> Config {
    Config {
        openai_api_key: Some("sk-test".to_string()),
        openai_base_url: upstream.to_string(),
        lichess_base_url: upstream.to_string(),
        chess_com_web_url: upstream.to_string(),
        chess_com_api_url: upstream.to_string(),
        upstream_timeout: Duration::from_secs(5),
        llm_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

/// Start the application against `upstream` and return its base URL.
pub async fn spawn_app(upstream: &str) -> String {
    spawn_app_with(&config_for(upstream)).await
}

pub async fn spawn_app_with(config: &Config) -> String {
    let app = server::app(config).expect("build app");
    spawn_upstream(|_| app).await
}

pub fn client() -> Client {
    Client::new()
}

pub fn http_client() -> Client {
    http_client_with_timeout(Duration::from_secs(5))
}

pub fn http_client_with_timeout(timeout: Duration) -> Client {
    server::clients::http_client(timeout).expect("http client")
}

/// Handler that answers only long after any test timeout has fired.
pub async fn stall() -> &'static str {
    tokio::time::sleep(Duration::from_secs(10)).await;
    "too late"
}

/// Chat-completion reply whose message content is `content` serialized.
pub fn completion(content: &Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content.to_string() },
            "finish_reason": "stop"
        }]
    })
}

/// Add a fake chat-completion endpoint that always answers `content`.
pub fn with_llm(router: Router, content: Value) -> Router {
    let reply = completion(&content);
    router.route(
        "/v1/chat/completions",
        post(move || {
            let reply = reply.clone();
            async move { Json(reply) }
        }),
    )
}

pub fn game_report() -> Value {
    json!({
        "summary": "White punished an early queen sortie.",
        "analyzedSide": "Black",
        "result": "1-0",
        "keyMoments": [
            {"moveNumber": 3, "description": "Queen attacks f7", "evaluationChange": -320}
        ],
        "mistakes": [
            {"moveNumber": 3, "movePlayed": "Nf6", "category": "blunder",
             "explanation": "Ignores the mate threat", "bestSuggestion": "g6"},
            {"moveNumber": "soon", "movePlayed": "??", "category": "blunder"}
        ]
    })
}

pub fn opponent_report() -> Value {
    json!({
        "globalSummary": "Aggressive player who neglects king safety.",
        "mainWeaknesses": ["King safety"],
        "frequentErrors": [{"theme": "f7 weakness", "description": "Leaves f7 weak", "howToPunish": "Target f7"}],
        "recommendedExercises": [{
            "title": "Punish the weak back rank",
            "description": "Find the mate",
            "exerciseType": "tactic",
            "estimatedLevel": "beginner",
            "positionFen": "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
            "solution": ["Rd8#"],
            "moveVariants": [{"move": "Rd8#", "isBest": true}]
        }]
    })
}

pub const SCHOLARS_MATE: &str =
    "[Event \"Live Chess\"]\n[Site \"Chess.com\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# 1-0";
