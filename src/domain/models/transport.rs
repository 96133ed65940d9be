use anyhow::Result;
use async_trait::async_trait;

use super::ConversationMessage;
use super::TransportError;

/// Client side of the chat API.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends the ordered window of recent turns and returns the reply text.
    /// How the window is rendered for the wire is up to the transport.
    async fn send_with_context(
        &self,
        window: &[ConversationMessage],
    ) -> Result<String, TransportError>;

    /// Never fails. An unreachable or broken server is reported as `false`.
    async fn health_check(&self) -> bool;
}

/// Upstream text-completion service the proxy forwards to.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Used when the proxy starts to verify the backend is configured. The
    /// `/api/health` route only reports that the proxy itself is up.
    async fn health_check(&self) -> Result<()>;

    /// Requests a single completion for a fully rendered prompt.
    async fn get_completion(&self, prompt: &str) -> Result<String>;
}
