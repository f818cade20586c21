//! Conversation state: messages, the pending flag and the submit lifecycle

pub mod controller;
pub mod message;

pub use controller::{
    ConversationController, PendingSubmission, Rejection, Snapshot, SubmitOutcome, FALLBACK_TEXT,
};
pub use message::{Message, MessageId, Sender};
