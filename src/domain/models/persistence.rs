use async_trait::async_trait;

use super::ChatSession;
use super::ConversationMessage;
use super::Language;
use super::PersistenceError;

/// Backing store for sessions and messages. The in-memory conversation is
/// authoritative; everything here is a best-effort mirror of it.
#[async_trait]
pub trait ChatPersistence: Send + Sync {
    /// Returns the user's active session for `language`, creating one if there
    /// is none.
    async fn current_session(
        &self,
        user_id: &str,
        language: Language,
    ) -> Result<ChatSession, PersistenceError>;

    /// Creates a new active session, deactivating the user's previous ones.
    async fn create_session(
        &self,
        user_id: &str,
        name: &str,
        language: Language,
    ) -> Result<ChatSession, PersistenceError>;

    async fn append_message(
        &self,
        session_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), PersistenceError>;

    /// Overwrites a stored message with the same id.
    async fn update_message(
        &self,
        session_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), PersistenceError>;

    /// Up to `limit` of the session's most recent messages, oldest first.
    async fn list_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, PersistenceError>;

    async fn rate_message(&self, message_id: &str, rating: u8) -> Result<(), PersistenceError>;

    /// The user's sessions, most recently updated first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, PersistenceError>;
}
