#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;

use super::clipboard::ClipboardService;
use super::SequentialRequestQueue;
use crate::domain::models::Author;
use crate::domain::models::ChatPersistence;
use crate::domain::models::ChatSession;
use crate::domain::models::ChatTransport;
use crate::domain::models::ConversationMessage;
use crate::domain::models::Language;
use crate::domain::models::MessageType;
use crate::domain::models::PersistenceError;
use crate::domain::models::TransportError;

/// Most turns ever sent to the completion endpoint in one request.
pub const CONTEXT_WINDOW_SIZE: usize = 10;

/// Most messages loaded back from the store when a session is opened.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingReply,
    Error,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, offline, or a reply is still pending.
    Ignored,
    Replied,
    Failed,
}

/// The trailing turns sent as context: error notices are local to the client
/// and never part of it.
pub fn build_window(messages: &[ConversationMessage]) -> Vec<ConversationMessage> {
    let turns = messages
        .iter()
        .filter(|message| return !message.is_error())
        .collect::<Vec<&ConversationMessage>>();

    let skip = turns.len().saturating_sub(CONTEXT_WINDOW_SIZE);
    return turns.into_iter().skip(skip).cloned().collect();
}

/// Owns the conversation a user is looking at. The in-memory transcript is the
/// source of truth; the store only ever receives best-effort copies through a
/// queue of its own, so writes land in the order they happened.
pub struct ConversationController {
    transport: Arc<dyn ChatTransport>,
    persistence: Arc<dyn ChatPersistence>,
    writes: SequentialRequestQueue,
    user_id: String,
    language: Language,
    session: Option<ChatSession>,
    messages: Vec<ConversationMessage>,
    state: ConversationState,
    online: bool,
}

impl ConversationController {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        persistence: Arc<dyn ChatPersistence>,
        user_id: &str,
        language: Language,
    ) -> ConversationController {
        return ConversationController {
            transport,
            persistence,
            writes: SequentialRequestQueue::new(),
            user_id: user_id.to_string(),
            language,
            session: None,
            messages: vec![],
            state: ConversationState::Idle,
            online: true,
        };
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        return &self.messages;
    }

    pub fn state(&self) -> ConversationState {
        return self.state;
    }

    pub fn session(&self) -> Option<&ChatSession> {
        return self.session.as_ref();
    }

    pub fn language(&self) -> Language {
        return self.language;
    }

    pub fn is_online(&self) -> bool {
        return self.online;
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn window(&self) -> Vec<ConversationMessage> {
        return build_window(&self.messages);
    }

    pub fn can_submit(&self, text: &str) -> bool {
        return !text.trim().is_empty()
            && self.online
            && self.state != ConversationState::AwaitingReply;
    }

    /// Picks up the user's current session and its history. Without a store
    /// the conversation still starts, just unsaved.
    pub async fn resume(&mut self) {
        let session = self.ensure_session().await;
        match self.persistence.list_messages(&session.id, HISTORY_LIMIT).await {
            Ok(history) => self.messages = history,
            Err(err) => {
                tracing::warn!(error = ?err, session_id = session.id, "Failed to load chat history");
            }
        }
        self.state = ConversationState::Idle;
    }

    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        if !self.can_submit(text) {
            return SubmitOutcome::Ignored;
        }

        self.ensure_session().await;

        let (user_message, window) = self.begin_submit(text);
        let res = self.transport.send_with_context(&window).await;

        return self.complete(user_message, res);
    }

    /// Callers check `can_submit` first.
    fn begin_submit(&mut self, text: &str) -> (ConversationMessage, Vec<ConversationMessage>) {
        let user_message = ConversationMessage::new(Author::User, text.trim());
        self.messages.push(user_message.clone());
        self.state = ConversationState::AwaitingReply;

        return (user_message, self.window());
    }

    fn complete(
        &mut self,
        user_message: ConversationMessage,
        res: Result<String, TransportError>,
    ) -> SubmitOutcome {
        match res {
            Ok(text) => {
                let reply = ConversationMessage::new(Author::Bot, &text);
                self.messages.push(reply.clone());
                self.state = ConversationState::Idle;
                self.mirror(vec![user_message, reply]);

                return SubmitOutcome::Replied;
            }
            Err(err) => {
                tracing::error!(error = %err, "Chat request failed");
                let notice = ConversationMessage::new_with_type(
                    Author::Bot,
                    MessageType::Error,
                    self.language.error_text(),
                );
                self.messages.push(notice.clone());
                self.state = ConversationState::Error;
                // The notice is stored so a later regenerate or rating has a
                // row to update. It stays out of every window.
                self.mirror(vec![user_message, notice]);

                return SubmitOutcome::Failed;
            }
        }
    }

    /// Replaces the transcript with the stored history of `session_id`. If the
    /// history can't be loaded the current conversation is left as it was.
    pub async fn switch_session(&mut self, session_id: &str) -> Result<(), PersistenceError> {
        self.flush().await;

        let session = self
            .persistence
            .list_sessions(&self.user_id)
            .await?
            .into_iter()
            .find(|session| return session.id == session_id)
            .ok_or_else(|| {
                return PersistenceError::NotFound {
                    entity: "session",
                    id: session_id.to_string(),
                };
            })?;
        let history = self
            .persistence
            .list_messages(session_id, HISTORY_LIMIT)
            .await?;

        self.session = Some(session);
        self.messages = history;
        self.state = ConversationState::Idle;

        return Ok(());
    }

    pub async fn new_session(&mut self, name: Option<&str>) -> ChatSession {
        self.flush().await;

        let name = name
            .filter(|name| return !name.trim().is_empty())
            .unwrap_or_else(|| return self.language.default_session_name())
            .to_string();

        let session = match self
            .persistence
            .create_session(&self.user_id, &name, self.language)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to store new session, continuing unsaved");
                ChatSession::new(&self.user_id, &name, self.language)
            }
        };

        self.session = Some(session.clone());
        self.messages = vec![];
        self.state = ConversationState::Idle;

        return session;
    }

    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>, PersistenceError> {
        return self.persistence.list_sessions(&self.user_id).await;
    }

    /// Asks again for the reply `message_id`, using only the turns before it.
    /// On failure the message is left untouched.
    pub async fn regenerate(&mut self, message_id: &str) -> Result<()> {
        let idx = self.position(message_id)?;
        if self.messages[idx].author != Author::Bot {
            bail!("Only replies from the guide can be regenerated");
        }

        let window = build_window(&self.messages[..idx]);
        if window.is_empty() {
            bail!("There is nothing before this reply to regenerate it from");
        }

        let text = match self.transport.send_with_context(&window).await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, message_id, "Regenerate failed");
                return Err(err.into());
            }
        };

        let message = &mut self.messages[idx];
        message.replace_text(&text);
        let updated = message.clone();

        if let Some(session) = &self.session {
            let persistence = self.persistence.clone();
            let session_id = session.id.to_string();
            let _ = self.writes.add(move || async move {
                if let Err(err) = persistence.update_message(&session_id, &updated).await {
                    tracing::warn!(error = ?err, message_id = updated.id, "Failed to store regenerated reply");
                }
                return anyhow::Ok(());
            });
        }

        return Ok(());
    }

    pub fn rate(&mut self, message_id: &str, rating: u8) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(PersistenceError::InvalidRating(rating).into());
        }

        let idx = self.position(message_id)?;
        if self.messages[idx].author != Author::Bot {
            bail!("Only replies from the guide can be rated");
        }
        self.messages[idx].rating = Some(rating);

        let persistence = self.persistence.clone();
        let message_id = message_id.to_string();
        let _ = self.writes.add(move || async move {
            if let Err(err) = persistence.rate_message(&message_id, rating).await {
                tracing::warn!(error = ?err, message_id, "Failed to store rating");
            }
            return anyhow::Ok(());
        });

        return Ok(());
    }

    pub fn copy(&self, message_id: &str) -> Result<()> {
        let idx = self.position(message_id)?;
        ClipboardService::set(self.messages[idx].text.to_string())?;

        return Ok(());
    }

    /// Waits until every queued store write has settled.
    pub async fn flush(&self) {
        let _ = self.writes.add(|| async { return anyhow::Ok(()) }).await;
    }

    fn position(&self, message_id: &str) -> Result<usize> {
        match self
            .messages
            .iter()
            .position(|message| return message.id == message_id)
        {
            Some(idx) => return Ok(idx),
            None => bail!("No message found for id {message_id}"),
        }
    }

    async fn ensure_session(&mut self) -> ChatSession {
        if let Some(session) = &self.session {
            return session.clone();
        }

        let session = match self
            .persistence
            .current_session(&self.user_id, self.language)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to load current session, continuing unsaved");
                ChatSession::new(
                    &self.user_id,
                    self.language.default_session_name(),
                    self.language,
                )
            }
        };

        self.session = Some(session.clone());
        return session;
    }

    fn mirror(&self, messages: Vec<ConversationMessage>) {
        let session_id = match &self.session {
            Some(session) => session.id.to_string(),
            None => return,
        };

        let persistence = self.persistence.clone();
        let _ = self.writes.add(move || async move {
            for message in messages {
                if let Err(err) = persistence.append_message(&session_id, &message).await {
                    tracing::warn!(error = ?err, session_id, message_id = message.id, "Failed to store message");
                }
            }
            return anyhow::Ok(());
        });
    }
}
