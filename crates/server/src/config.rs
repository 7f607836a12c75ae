use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Checked when the first report is requested, not at startup.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub lichess_base_url: String,
    pub chess_com_web_url: String,
    pub chess_com_api_url: String,
    pub upstream_timeout: Duration,
    pub llm_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            lichess_base_url: "https://lichess.org".to_string(),
            chess_com_web_url: "https://www.chess.com".to_string(),
            chess_com_api_url: "https://api.chess.com".to_string(),
            upstream_timeout: Duration::from_secs(20),
            llm_timeout: Duration::from_secs(120),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            openai_model: env::var("OPENAI_MODEL")
                .ok()
                .map(|model| model.trim().to_string())
                .filter(|model| !model.is_empty())
                .unwrap_or(defaults.openai_model),
            openai_base_url: base_url("OPENAI_BASE_URL", defaults.openai_base_url),
            lichess_base_url: base_url("LICHESS_BASE_URL", defaults.lichess_base_url),
            chess_com_web_url: base_url("CHESS_COM_WEB_URL", defaults.chess_com_web_url),
            chess_com_api_url: base_url("CHESS_COM_API_URL", defaults.chess_com_api_url),
            upstream_timeout: seconds("UPSTREAM_TIMEOUT_SECS").unwrap_or(defaults.upstream_timeout),
            llm_timeout: seconds("LLM_TIMEOUT_SECS").unwrap_or(defaults.llm_timeout),
        }
    }
}

fn base_url(var: &str, default: String) -> String {
    env::var(var)
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .ok()
        .filter(|url| !url.is_empty())
        .unwrap_or(default)
}

fn seconds(var: &str) -> Option<Duration> {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
