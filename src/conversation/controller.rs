//! Conversation controller: the single owner of the message list and the
//! pending flag.
//!
//! A submit runs in two phases. The user message is appended and the pending
//! flag raised in one critical section, then the gateway is awaited with no
//! lock held, and finally the answer (or the fallback text) is appended and
//! the pending flag cleared under one lock. The flag is owned by a guard so it
//! is also cleared when the submit future is dropped.

use crate::conversation::message::Message;
use crate::gateway::Gateway;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Bot text appended when the backend cannot be reached
pub const FALLBACK_TEXT: &str = "⚠️ Failed to connect to the backend. Please try again.";

/// Why a submit was refused without touching the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing left after trimming
    Empty,
    /// A gateway call is already in flight
    Busy,
}

/// Result of one `submit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Answered,
    /// The gateway failed and the fallback message was appended
    Failed,
    Rejected(Rejection),
}

/// Owned view of the conversation for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub messages: Vec<Message>,
    pub pending: bool,
}

#[derive(Default)]
struct ConversationState {
    messages: Vec<Message>,
    pending: bool,
}

struct Shared {
    state: Mutex<ConversationState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        // State is only mutated in short sections that cannot panic midway
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

}

/// Holds the pending flag for the lifetime of one gateway call
struct PendingGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl PendingGuard {
    /// Append the resolution and clear the flag in the same critical section
    fn complete(mut self, message: Message) {
        {
            let mut state = self.shared.lock();
            state.messages.push(message);
            state.pending = false;
        }
        self.armed = false;
        self.shared.bump();
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().pending = false;
            self.shared.bump();
        }
    }
}

/// Cheap-to-clone handle to one conversation
pub struct ConversationController<G> {
    shared: Arc<Shared>,
    gateway: Arc<G>,
}

impl<G> Clone for ConversationController<G> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<G: Gateway> ConversationController<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_shared_gateway(Arc::new(gateway))
    }

    pub fn with_shared_gateway(gateway: Arc<G>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ConversationState::default()),
                revision,
            }),
            gateway,
        }
    }

    /// Send `text` to the backend and record both sides of the exchange.
    ///
    /// Empty input and calls made while another call is in flight are
    /// rejected without changing any state. Gateway failures never escape;
    /// they become a bot message carrying [`FALLBACK_TEXT`].
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        match self.begin_submit(text) {
            Ok(submission) => submission.resolve().await,
            Err(rejection) => SubmitOutcome::Rejected(rejection),
        }
    }

    /// Optimistic phase of a submit: append the user message and raise the
    /// pending flag in one critical section. The returned submission must be
    /// resolved to reach the backend; dropping it clears the pending flag.
    pub fn begin_submit(&self, text: &str) -> Result<PendingSubmission<G>, Rejection> {
        let query = text.trim();
        if query.is_empty() {
            return Err(Rejection::Empty);
        }

        {
            let mut state = self.shared.lock();
            if state.pending {
                tracing::debug!("submit rejected, a request is already in flight");
                return Err(Rejection::Busy);
            }
            state.messages.push(Message::user(query));
            state.pending = true;
        }
        self.shared.bump();

        Ok(PendingSubmission {
            query: query.to_string(),
            gateway: Arc::clone(&self.gateway),
            guard: PendingGuard {
                shared: Arc::clone(&self.shared),
                armed: true,
            },
        })
    }
}

/// A submit whose user message is already in the conversation and whose
/// gateway call has not resolved yet
pub struct PendingSubmission<G> {
    query: String,
    gateway: Arc<G>,
    guard: PendingGuard,
}

impl<G: Gateway> PendingSubmission<G> {
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Call the gateway once and append its answer or the fallback text
    pub async fn resolve(self) -> SubmitOutcome {
        let PendingSubmission {
            query,
            gateway,
            guard,
        } = self;

        match gateway.ask(&query).await {
            Ok(answer) => {
                guard.complete(Message::bot(answer));
                SubmitOutcome::Answered
            }
            Err(err) => {
                tracing::warn!(error = %err, "backend call failed");
                guard.complete(Message::bot(FALLBACK_TEXT));
                SubmitOutcome::Failed
            }
        }
    }
}

impl<G> ConversationController<G> {
    pub fn snapshot(&self) -> Snapshot {
        let state = self.shared.lock();
        Snapshot {
            messages: state.messages.clone(),
            pending: state.pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.shared.lock().pending
    }

    pub fn message_count(&self) -> usize {
        self.shared.lock().messages.len()
    }

    /// Receiver whose value changes every time the conversation changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}
