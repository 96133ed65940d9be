use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumString;
use strum::EnumVariantNames;

/// Languages the chat widget can speak to the user in. Only the client's own
/// notices are localized here; the model is asked to answer in whatever
/// language the user writes.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    EnumVariantNames,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Vi,
    Fr,
}

impl Language {
    pub fn parse(text: &str) -> Option<Language> {
        return text.trim().to_lowercase().parse::<Language>().ok();
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            Language::En => return "Hello! I'm your travel guide. Ask me about places, tours, food or music.",
            Language::Vi => return "Xin chào! Tôi là hướng dẫn viên du lịch của bạn. Hãy hỏi tôi về địa điểm, tour, ẩm thực hoặc âm nhạc.",
            Language::Fr => return "Bonjour ! Je suis votre guide de voyage. Posez-moi vos questions sur les lieux, les circuits, la cuisine ou la musique.",
        }
    }

    /// Body of the error-flagged reply shown when a send fails. The upstream
    /// error never reaches the transcript.
    pub fn error_text(&self) -> &'static str {
        match self {
            Language::En => return "Sorry, something went wrong while contacting the travel assistant. Please try again.",
            Language::Vi => return "Xin lỗi, đã có lỗi xảy ra khi kết nối với trợ lý du lịch. Vui lòng thử lại.",
            Language::Fr => return "Désolé, une erreur s'est produite lors de la communication avec l'assistant de voyage. Veuillez réessayer.",
        }
    }

    pub fn offline_text(&self) -> &'static str {
        match self {
            Language::En => return "You appear to be offline. Check that the chat server is running and try again.",
            Language::Vi => return "Bạn đang ngoại tuyến. Hãy kiểm tra máy chủ trò chuyện và thử lại.",
            Language::Fr => return "Vous semblez hors ligne. Vérifiez que le serveur de discussion fonctionne puis réessayez.",
        }
    }

    pub fn default_session_name(&self) -> &'static str {
        match self {
            Language::En => return "New chat",
            Language::Vi => return "Cuộc trò chuyện mới",
            Language::Fr => return "Nouvelle conversation",
        }
    }
}
