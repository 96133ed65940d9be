#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;

use std::env;
use std::path;

use async_trait::async_trait;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::models::ChatPersistence;
use crate::domain::models::ChatSession;
use crate::domain::models::ConversationMessage;
use crate::domain::models::Language;
use crate::domain::models::PersistenceError;

#[derive(Serialize, Deserialize)]
struct SessionFile {
    version: String,
    session: ChatSession,
    messages: Vec<ConversationMessage>,
}

fn not_found(entity: &'static str, id: &str) -> PersistenceError {
    return PersistenceError::NotFound {
        entity,
        id: id.to_string(),
    };
}

/// File-backed session store: one YAML document per session, holding the
/// session record and every message in it.
pub struct Sessions {
    pub cache_dir: path::PathBuf,
    write_lock: Mutex<()>,
}

impl Default for Sessions {
    fn default() -> Sessions {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("guidechat/sessions");

        return Sessions::new(cache_dir);
    }
}

impl Sessions {
    pub fn new(cache_dir: path::PathBuf) -> Sessions {
        return Sessions {
            cache_dir,
            write_lock: Mutex::new(()),
        };
    }

    fn get_file_path(&self, id: &str) -> path::PathBuf {
        return self.cache_dir.join(format!("{id}.yaml"));
    }

    async fn read(&self, id: &str) -> Result<SessionFile, PersistenceError> {
        let file_path = self.get_file_path(id);
        if !file_path.exists() {
            return Err(not_found("session", id));
        }

        let payload = fs::read_to_string(file_path).await?;
        let file: SessionFile = serde_yaml::from_str(&payload)?;

        return Ok(file);
    }

    /// Unreadable files are skipped so one corrupt session can't hide the
    /// others.
    async fn read_all(&self) -> Result<Vec<SessionFile>, PersistenceError> {
        let mut files: Vec<SessionFile> = vec![];
        if !self.cache_dir.exists() {
            return Ok(files);
        }

        let mut dir = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let entry_path = entry.path();
            if entry_path.extension().and_then(|ext| return ext.to_str()) != Some("yaml") {
                continue;
            }

            let payload = fs::read_to_string(&entry_path).await?;
            match serde_yaml::from_str::<SessionFile>(&payload) {
                Ok(file) => files.push(file),
                Err(err) => {
                    tracing::warn!(path = ?entry_path, error = ?err, "Skipping unreadable session file");
                }
            }
        }

        return Ok(files);
    }

    async fn write(&self, file: &SessionFile) -> Result<(), PersistenceError> {
        let payload = serde_yaml::to_string(file)?;

        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir).await?;
        }

        let mut handle = fs::File::create(self.get_file_path(&file.session.id)).await?;
        handle.write_all(payload.as_bytes()).await?;
        handle.flush().await?;

        return Ok(());
    }

    async fn create(
        &self,
        user_id: &str,
        name: &str,
        language: Language,
    ) -> Result<ChatSession, PersistenceError> {
        for mut file in self.read_all().await? {
            if file.session.user_id == user_id && file.session.active {
                file.session.active = false;
                self.write(&file).await?;
            }
        }

        let session = ChatSession::new(user_id, name, language);
        self.write(&SessionFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            session: session.clone(),
            messages: vec![],
        })
        .await?;

        tracing::debug!(session_id = session.id, user_id, "Created chat session");

        return Ok(session);
    }

    /// Every session on disk regardless of owner, most recent first.
    pub async fn list_all(&self) -> Result<Vec<ChatSession>, PersistenceError> {
        let mut sessions = self
            .read_all()
            .await?
            .into_iter()
            .map(|file| return file.session)
            .collect::<Vec<ChatSession>>();

        sessions.sort_by(|a, b| return b.updated_at.cmp(&a.updated_at));

        return Ok(sessions);
    }

    pub async fn load(&self, id: &str) -> Result<ChatSession, PersistenceError> {
        return Ok(self.read(id).await?.session);
    }

    pub async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let file_path = self.get_file_path(id);
        if !file_path.exists() {
            return Ok(());
        }

        fs::remove_file(file_path).await?;
        return Ok(());
    }

    pub async fn delete_all(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        if !self.cache_dir.exists() {
            return Ok(());
        }

        fs::remove_dir_all(&self.cache_dir).await?;
        return Ok(());
    }
}

#[async_trait]
impl ChatPersistence for Sessions {
    async fn current_session(
        &self,
        user_id: &str,
        language: Language,
    ) -> Result<ChatSession, PersistenceError> {
        let _guard = self.write_lock.lock().await;

        let current = self
            .read_all()
            .await?
            .into_iter()
            .map(|file| return file.session)
            .filter(|session| {
                return session.user_id == user_id && session.active && session.language == language;
            })
            .max_by_key(|session| return session.updated_at);

        if let Some(session) = current {
            return Ok(session);
        }

        return self
            .create(user_id, language.default_session_name(), language)
            .await;
    }

    async fn create_session(
        &self,
        user_id: &str,
        name: &str,
        language: Language,
    ) -> Result<ChatSession, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        return self.create(user_id, name, language).await;
    }

    async fn append_message(
        &self,
        session_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.read(session_id).await?;
        file.messages.push(message.clone());
        file.session.updated_at = Utc::now();

        return self.write(&file).await;
    }

    async fn update_message(
        &self,
        session_id: &str,
        message: &ConversationMessage,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.read(session_id).await?;
        let stored = file
            .messages
            .iter_mut()
            .find(|stored| return stored.id == message.id)
            .ok_or_else(|| return not_found("message", &message.id))?;
        *stored = message.clone();
        file.session.updated_at = Utc::now();

        return self.write(&file).await;
    }

    async fn list_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, PersistenceError> {
        // Append order is chronological; a regenerated reply keeps its slot
        // even though its timestamp moves.
        let messages = self.read(session_id).await?.messages;

        let skip = messages.len().saturating_sub(limit);
        return Ok(messages.into_iter().skip(skip).collect());
    }

    async fn rate_message(&self, message_id: &str, rating: u8) -> Result<(), PersistenceError> {
        if !(1..=5).contains(&rating) {
            return Err(PersistenceError::InvalidRating(rating));
        }

        let _guard = self.write_lock.lock().await;

        for mut file in self.read_all().await? {
            if let Some(message) = file
                .messages
                .iter_mut()
                .find(|message| return message.id == message_id)
            {
                message.rating = Some(rating);
                return self.write(&file).await;
            }
        }

        return Err(not_found("message", message_id));
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, PersistenceError> {
        return Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|session| return session.user_id == user_id)
            .collect());
    }
}
