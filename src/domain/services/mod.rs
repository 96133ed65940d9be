pub mod clipboard;
mod conversation;
mod queue;
mod sessions;

pub use conversation::*;
pub use queue::*;
pub use sessions::*;
