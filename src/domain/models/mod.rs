mod author;
mod errors;
mod language;
mod message;
mod persistence;
mod prompt;
mod session;
mod slash_commands;
mod transport;

pub use author::*;
pub use errors::*;
pub use language::*;
pub use message::*;
pub use persistence::*;
pub use prompt::*;
pub use session::*;
pub use slash_commands::*;
pub use transport::*;
