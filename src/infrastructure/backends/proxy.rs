#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatTransport;
use crate::domain::models::ConversationMessage;
use crate::domain::models::Prompt;
use crate::domain::models::TransportError;
use crate::domain::services::SequentialRequestQueue;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn request_err(err: reqwest::Error) -> TransportError {
    return TransportError::Request(err.to_string());
}

async fn post_chat(client: reqwest::Client, url: String, message: String) -> Result<String> {
    let res = client
        .post(url)
        .json(&ChatRequest { message })
        .send()
        .await
        .map_err(request_err)?;

    let status = res.status();
    let body = res.text().await.map_err(request_err)?;
    let parsed = serde_json::from_str::<ChatResponse>(&body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .and_then(|res| return res.error)
            .unwrap_or(body);
        tracing::error!(status = status.as_u16(), error = message.as_str(), "Chat server rejected request");

        return Err(TransportError::Status {
            status: status.as_u16(),
            message,
        }
        .into());
    }

    let reply = match parsed {
        Ok(res) => res.reply.unwrap_or_default(),
        Err(err) => {
            return Err(TransportError::Request(format!("malformed chat reply: {err}")).into());
        }
    };

    if reply.trim().is_empty() {
        return Err(TransportError::EmptyReply.into());
    }

    return Ok(reply);
}

/// Talks to the chat proxy over HTTP. Chat requests go through the request
/// queue one at a time; health checks bypass it.
pub struct ProxyTransport {
    url: String,
    health_check_timeout: Duration,
    queue: SequentialRequestQueue,
    client: reqwest::Client,
}

impl ProxyTransport {
    pub fn new(
        url: &str,
        queue: SequentialRequestQueue,
        health_check_timeout: Duration,
    ) -> ProxyTransport {
        return ProxyTransport {
            url: url.trim_end_matches('/').to_string(),
            health_check_timeout,
            queue,
            client: reqwest::Client::new(),
        };
    }

    pub fn from_config() -> ProxyTransport {
        return ProxyTransport::new(
            &Config::get(ConfigKey::ServerUrl),
            SequentialRequestQueue::with_timeout(Config::get_duration(ConfigKey::RequestTimeout)),
            Config::get_duration(ConfigKey::HealthCheckTimeout),
        );
    }
}

#[async_trait]
impl ChatTransport for ProxyTransport {
    async fn send_with_context(
        &self,
        window: &[ConversationMessage],
    ) -> Result<String, TransportError> {
        let prompt = Prompt::from_window(window);
        let client = self.client.clone();
        let url = format!("{}/api/chat", self.url);

        tracing::debug!(turns = window.len(), queued = self.queue.length(), "Sending chat request");
        let outcome = self
            .queue
            .add(move || return post_chat(client, url, prompt.text));

        return outcome.await.map_err(TransportError::from);
    }

    async fn health_check(&self) -> bool {
        let res = self
            .client
            .get(format!("{}/api/health", self.url))
            .timeout(self.health_check_timeout)
            .send()
            .await;

        match res {
            Ok(res) if res.status().is_success() => return true,
            Ok(res) => {
                tracing::warn!(status = res.status().as_u16(), "Chat server health check failed");
                return false;
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Chat server is not reachable");
                return false;
            }
        }
    }
}
