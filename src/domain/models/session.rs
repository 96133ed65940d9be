use chrono::DateTime;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use uuid::Uuid;

use super::Language;

/// A named conversation thread owned by one user, in one language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub language: Language,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(user_id: &str, name: &str, language: Language) -> ChatSession {
        let now = Utc::now();
        return ChatSession {
            id: ChatSession::create_id(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            language,
            active: true,
            created_at: now,
            updated_at: now,
        };
    }

    /// Short ids are easier to type into `/switch` and `sessions open`.
    pub fn create_id() -> String {
        return Uuid::new_v4()
            .to_string()
            .split('-')
            .take(2)
            .collect::<Vec<&str>>()
            .join("-");
    }
}
