//! Conversation state for the assistant: the turn log the UI renders, the
//! per-session record of the remote conversation, and the orchestrator that
//! drives a question through submit and poll to a settled answer.

pub mod orchestrator;
pub mod session;
pub mod turn;

pub use orchestrator::{
    AskError, DEFAULT_POLL_INTERVAL, MAX_POLL_ATTEMPTS, Orchestrator, PLACEHOLDER_TEXT, Tick,
};
pub use session::ConversationSession;
pub use turn::{GREETING, Turn, TurnLog, TurnRole};
