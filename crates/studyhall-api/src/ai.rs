//! Text-generation client for the AI study tools.
//!
//! Talks to a Gemini-style `generateContent` endpoint when an API key is
//! configured. Without a key (or when the upstream call fails) the
//! routes fall back to deterministic offline content, so the study tools
//! always answer.

use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl AiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key,
            model: model.into(),
        }
    }

    /// Generate text for a prompt. Returns `None` when no key is
    /// configured or the upstream call fails; callers serve their
    /// offline fallback in that case.
    pub async fn generate(&self, prompt: &str) -> Option<String> {
        let api_key = self.api_key.as_deref()?;
        let url = format!("{API_BASE}/{}:generateContent?key={api_key}", self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "AI backend unreachable, serving fallback");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "AI backend error, serving fallback");
            return None;
        }

        let payload: serde_json::Value = response.json().await.ok()?;
        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_owned)
    }
}
