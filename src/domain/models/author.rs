use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Author {
    User,
    Bot,
}

impl Author {
    /// Label written in front of each turn when a window is flattened into a
    /// prompt.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Author::User => return "User",
            Author::Bot => return "Assistant",
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Author::User => {
                let username = Config::get(ConfigKey::Username);
                if username.is_empty() {
                    return "You".to_string();
                }
                return username;
            }
            Author::Bot => return "Guide".to_string(),
        }
    }
}
