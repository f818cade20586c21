//! Conversation UI components for chat interface

pub mod commands;
pub mod composer;
pub mod header;
pub mod history;
pub mod manager;
pub mod typing;

pub use commands::{get_help_text, ParsedCommand, SlashCommand};
pub use composer::ConversationComposer;
pub use history::ConversationHistory;
pub use manager::{ChatView, ConversationAction, ConversationManager};
