#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::CompletionBackend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ContentParts {
    Text(String),
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<ContentParts>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionRequest {
    contents: Vec<Content>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

impl GenerateContentResponse {
    /// Text of the first candidate, with its parts joined.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text = content
            .parts
            .iter()
            .map(|part| match part {
                ContentParts::Text(text) => return text.as_str(),
            })
            .collect::<Vec<&str>>()
            .join("");

        if text.trim().is_empty() {
            return None;
        }

        return Some(text);
    }
}

pub struct Gemini {
    url: String,
    token: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl Gemini {
    pub fn new(url: &str, token: &str, model: &str, timeout: Duration) -> Gemini {
        return Gemini {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            model: model.to_string(),
            timeout,
            client: reqwest::Client::new(),
        };
    }

    pub fn from_config() -> Gemini {
        return Gemini::new(
            &Config::get(ConfigKey::GeminiUrl),
            &Config::get(ConfigKey::ApiKey),
            &Config::get(ConfigKey::Model),
            Config::get_duration(ConfigKey::HealthCheckTimeout),
        );
    }
}

#[async_trait]
impl CompletionBackend for Gemini {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.token.is_empty() {
            bail!("Gemini API key is not defined");
        }

        let url = format!(
            "{url}/v1beta/{model}?key={key}",
            url = self.url,
            model = self.model,
            key = self.token
        );

        let res = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "Gemini is not reachable");
                bail!("Gemini is not reachable");
            }
        };

        let status = res.status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "Gemini health check failed");
            bail!("Gemini health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn get_completion(&self, prompt: &str) -> Result<String> {
        let req = CompletionRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![ContentParts::Text(prompt.to_string())],
            }],
        };

        let res = self
            .client
            .post(format!(
                "{url}/v1beta/{model}:generateContent?key={key}",
                url = self.url,
                model = self.model,
                key = self.token,
            ))
            .json(&req)
            .send()
            .await?;

        let status = res.status().as_u16();
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => err.error.message,
                Err(_) => body,
            };
            tracing::error!(status = status, error = message.as_str(), "Failed to make completion request to Gemini");
            bail!("Failed to make completion request to Gemini, {status}: {message}");
        }

        let res = res.json::<GenerateContentResponse>().await?;
        match res.text() {
            Some(text) => return Ok(text),
            None => {
                tracing::warn!(candidates = res.candidates.len(), "Gemini returned no candidate text");
                bail!("Gemini returned no candidate text");
            }
        }
    }
}
