#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;

use super::ConversationMessage;

pub const SYSTEM_PREAMBLE: &str = "You are a friendly local travel guide inside a tourism information app. Help with places, categories, tours, articles and music. Keep answers short and practical, and reply in the language the user writes in.";

/// A single-text rendition of a conversation window, for completion endpoints
/// that have no notion of turns. The endpoint keeps no memory between calls,
/// so every prompt carries the whole window.
pub struct Prompt {
    pub text: String,
}

impl Prompt {
    pub fn from_window(window: &[ConversationMessage]) -> Prompt {
        let turns = window
            .iter()
            .map(|message| {
                return format!("{}: {}", message.author.prompt_label(), message.text);
            })
            .collect::<Vec<String>>();

        if turns.is_empty() {
            return Prompt {
                text: SYSTEM_PREAMBLE.to_string(),
            };
        }

        return Prompt {
            text: format!("{SYSTEM_PREAMBLE}\n\n{}", turns.join("\n")),
        };
    }
}
