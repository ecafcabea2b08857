//! Consuming side of chat and caption traffic.
pub mod chat_history;

pub use chat_history::{CaptionOutcome, ChatEntry, ChatHistory};
