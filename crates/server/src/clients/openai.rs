use reqwest::{Client, StatusCode};
use serde_json::{json, Value as JsonValue};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("OpenAI API key is not configured.")]
    MissingApiKey,

    #[error("Invalid OpenAI API key. Check your configuration.")]
    InvalidApiKey,

    #[error("OpenAI rate limit reached. Try again in a few moments.")]
    RateLimited,

    #[error("Error while calling OpenAI: {0}")]
    Request(String),

    #[error("OpenAI returned no content.")]
    EmptyContent,

    #[error("Invalid OpenAI response: {0}")]
    InvalidResponse(String),
}

/// Chat-completion client that asks for a JSON object reply.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: Client,
}

impl OpenAiClient {
    pub fn new(http: Client, api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            http,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a system and user message; returns the raw message content,
    /// which the caller validates.
    pub async fn complete_json(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" }
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::info!(model = %self.model, prompt_len = prompt.len(), "Requesting completion");

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Request("request timed out".to_string())
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::Request(e.to_string()))?;
        if !status.is_success() {
            tracing::error!(%status, body = %truncate_for_error(&body, 500), "OpenAI call failed");
            return Err(classify_api_error(status, &body));
        }

        let payload: JsonValue = serde_json::from_str(&body).map_err(|err| {
            LlmError::InvalidResponse(format!("failed to parse JSON: {err}; body={}", truncate_for_error(&body, 200)))
        })?;
        extract_message_content(&payload).ok_or(LlmError::EmptyContent)
    }
}

fn extract_message_content(payload: &JsonValue) -> Option<String> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

fn classify_api_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(JsonValue::as_str).map(String::from))
        .unwrap_or_else(|| truncate_for_error(body, 200));
    let lowered = body.to_lowercase();

    if status == StatusCode::UNAUTHORIZED
        || lowered.contains("invalid_api_key")
        || lowered.contains("incorrect api key")
    {
        LlmError::InvalidApiKey
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || lowered.contains("rate limit")
        || lowered.contains("rate_limit")
        || lowered.contains("quota")
    {
        LlmError::RateLimited
    } else {
        LlmError::Request(format!("HTTP {status}: {message}"))
    }
}

fn truncate_for_error(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &value[..end])
}
