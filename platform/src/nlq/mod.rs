//! Client for the hosted conversational NL-to-SQL engine.
//!
//! The engine is asynchronous on the server side: a question is submitted to
//! a conversation, then its message is polled until it reaches a terminal
//! state. This module owns the wire format (`api`), the REST engine
//! (`engine`), and the small vocabulary shared with callers: a pending
//! exchange handle, the status taxonomy, and the per-poll snapshot.

pub(crate) mod api;
mod engine;

pub use engine::{EngineTransport, RestQueryEngine};

use async_trait::async_trait;

use crate::error::PlatformError;

/// Identifies one in-flight question: which remote conversation it belongs
/// to and which message to poll. The question text rides along because
/// answer extraction must distinguish a real answer from an echo of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHandle {
    pub conversation_id: String,
    pub message_id: String,
    pub question: String,
}

/// Local taxonomy over the engine's coarse processing states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    /// Queued, or in any state we do not recognize.
    Pending,
    /// The engine is building a SQL query.
    Generating,
    /// The query is running against the warehouse.
    Executing,
    Completed,
    Failed,
}

impl QueryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryStatus::Completed | QueryStatus::Failed)
    }

    /// Progress text shown while the question is still being worked on.
    pub fn progress_text(&self) -> &'static str {
        match self {
            QueryStatus::Pending => "Starting query...",
            QueryStatus::Generating => "Generating SQL query...",
            QueryStatus::Executing => "Executing query on your data...",
            QueryStatus::Completed => "Complete",
            QueryStatus::Failed => "Failed",
        }
    }
}

/// Snapshot returned by one poll cycle. Transient: consumed by the caller,
/// never stored.
#[derive(Clone, Debug)]
pub struct PollResult {
    pub status: QueryStatus,
    pub message: Option<String>,
    pub answer: Option<String>,
    pub sql: Option<String>,
    pub error: Option<String>,
}

impl PollResult {
    pub(crate) fn in_progress(status: QueryStatus) -> Self {
        PollResult {
            status,
            message: Some(status.progress_text().to_string()),
            answer: None,
            sql: None,
            error: None,
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        PollResult {
            status: QueryStatus::Failed,
            message: None,
            answer: None,
            sql: None,
            error: Some(error.into()),
        }
    }
}

/// Seam between the conversation orchestrator and whichever backend answers
/// questions. The REST engine is the production implementation; tests drive
/// the orchestrator with scripted fakes.
#[async_trait]
pub trait QueryEngine {
    /// Begin a remote conversation, or continue the one identified by
    /// `existing_conversation_id`. Never retried at this layer.
    async fn start_or_continue(
        &self,
        question: &str,
        existing_conversation_id: Option<&str>,
    ) -> Result<SessionHandle, PlatformError>;

    /// One status round trip for the handle's message. Transport failures
    /// are folded into a `Failed` result; the caller decides whether the
    /// session survives.
    async fn poll(&self, handle: &SessionHandle) -> PollResult;
}
