#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use uuid::Uuid;

use super::Author;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Normal,
    Error,
}

/// One turn of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub author: Author,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    mtype: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl ConversationMessage {
    pub fn new(author: Author, text: &str) -> ConversationMessage {
        return ConversationMessage::new_with_type(author, MessageType::Normal, text);
    }

    pub fn new_with_type(author: Author, mtype: MessageType, text: &str) -> ConversationMessage {
        return ConversationMessage {
            id: Uuid::new_v4().to_string(),
            author,
            text: text.to_string(),
            timestamp: Utc::now(),
            mtype,
            rating: None,
        };
    }

    pub fn message_type(&self) -> MessageType {
        return self.mtype;
    }

    pub fn is_error(&self) -> bool {
        return self.mtype == MessageType::Error;
    }

    /// Swaps in a regenerated body. The message keeps its identity and
    /// position, but counts as a fresh, healthy reply.
    pub fn replace_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.timestamp = Utc::now();
        self.mtype = MessageType::Normal;
    }
}
