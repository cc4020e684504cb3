//! Binds the query engine and the turn log into a single two-phase "ask"
//! operation.
//!
//! Phase 1 (`ask`) appends the user turn plus a placeholder answer and
//! submits the question. Phase 2 is driven from outside: whatever timer the
//! host environment provides calls `tick` on a fixed cadence, one poll per
//! tick, until the exchange settles. The state machine holds its progress
//! in values, not in a suspended call stack, so it is testable without any
//! UI framework.

use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use platform::{PlatformError, QueryEngine, QueryStatus, SessionHandle};

use crate::session::ConversationSession;
use crate::turn::{Turn, TurnLog};

/// Poll cycles allowed per question before the local timeout fires.
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// Cadence the presentation layer is expected to call `tick` at.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub const PLACEHOLDER_TEXT: &str = "Thinking and querying your data...";

const TIMEOUT_TEXT: &str =
    "The query is taking longer than expected. Please try a simpler question.";

/// Outcome of one externally-triggered poll step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Nothing in flight; the timer should be off.
    Idle,
    /// Still working; progress text for the placeholder.
    Waiting(String),
    /// Terminal turn written; stop the timer and re-enable input.
    Settled,
}

/// Local preconditions an `ask` can violate. Remote failures never surface
/// here — they become terminal assistant turns instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AskError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("a question is already in flight")]
    Busy,
}

struct InFlight {
    handle: SessionHandle,
    placeholder_index: usize,
}

pub struct Orchestrator<E: QueryEngine> {
    engine: E,
    log: TurnLog,
    session: Option<ConversationSession>,
    in_flight: Option<InFlight>,
}

impl<E: QueryEngine> Orchestrator<E> {
    pub fn new(engine: E) -> Self {
        Orchestrator {
            engine,
            log: TurnLog::new(),
            session: None,
            in_flight: None,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        self.log.turns()
    }

    pub fn session(&self) -> Option<&ConversationSession> {
        self.session.as_ref()
    }

    /// True while a poll cycle may still be outstanding. The presentation
    /// layer must not submit a new question while this holds.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Phase 1: append the user turn and a placeholder, then begin or
    /// continue the remote conversation. A remote failure settles the
    /// placeholder immediately; `Err` is returned only for local
    /// precondition violations.
    pub async fn ask(&mut self, question: &str) -> Result<(), AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }
        if self.in_flight.is_some() {
            return Err(AskError::Busy);
        }

        let existing = self
            .session
            .as_ref()
            .and_then(|s| s.conversation_id.clone());

        let mut user = Turn::user(question);
        if let Some(id) = &existing {
            user = user.with_conversation_id(id.clone());
        }
        let user_index = self.log.push(user);
        let placeholder_index = self.log.push(Turn::assistant(PLACEHOLDER_TEXT));

        match self
            .engine
            .start_or_continue(question, existing.as_deref())
            .await
        {
            Ok(handle) => {
                self.log
                    .assign_conversation_id(user_index, &handle.conversation_id);
                self.session = Some(ConversationSession::begin(&handle));
                self.in_flight = Some(InFlight {
                    handle,
                    placeholder_index,
                });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to submit question");
                self.log
                    .replace(placeholder_index, Turn::assistant(describe_error(&e)));
                Ok(())
            }
        }
    }

    /// Phase 2: one poll cycle. Call on a fixed cadence until `Settled`.
    pub async fn tick(&mut self) -> Tick {
        let Some(in_flight) = &self.in_flight else {
            return Tick::Idle;
        };
        let handle = in_flight.handle.clone();
        let placeholder_index = in_flight.placeholder_index;

        let result = self.engine.poll(&handle).await;
        match result.status {
            QueryStatus::Completed => {
                let answer = result
                    .answer
                    .unwrap_or_else(|| "Query completed.".to_string());
                let mut text = answer;
                if let Some(sql) = &result.sql {
                    text.push_str(&format!("\n\n**Query used:**\n```sql\n{}\n```", sql));
                }
                let turn = Turn::assistant(text)
                    .with_sql(result.sql)
                    .with_conversation_id(handle.conversation_id.clone());
                self.settle(placeholder_index, turn);
                Tick::Settled
            }
            QueryStatus::Failed => {
                let error = result.error.unwrap_or_else(|| "Query failed".to_string());
                let turn = Turn::assistant(format!("Query failed: {}", error))
                    .with_conversation_id(handle.conversation_id.clone());
                self.settle(placeholder_index, turn);
                Tick::Settled
            }
            _ => {
                let attempts = self
                    .session
                    .as_mut()
                    .map(|s| s.record_attempt())
                    .unwrap_or(0);
                if attempts > MAX_POLL_ATTEMPTS {
                    // Cooperative cancellation only: the remote computation
                    // keeps running and is simply abandoned.
                    let error = PlatformError::Timeout { attempts };
                    warn!(
                        error = %error,
                        conversation_id = %handle.conversation_id,
                        "abandoning remote query"
                    );
                    let turn = Turn::assistant(TIMEOUT_TEXT)
                        .with_conversation_id(handle.conversation_id.clone());
                    self.settle(placeholder_index, turn);
                    Tick::Settled
                } else {
                    Tick::Waiting(
                        result
                            .message
                            .unwrap_or_else(|| result.status.progress_text().to_string()),
                    )
                }
            }
        }
    }

    /// Convenience driver: ask, then poll at `interval` until settled.
    /// Returns the terminal assistant turn.
    pub async fn ask_and_wait(
        &mut self,
        question: &str,
        interval: Duration,
    ) -> Result<&Turn, AskError> {
        self.ask(question).await?;
        while self.is_busy() {
            tokio::time::sleep(interval).await;
            self.tick().await;
        }
        Ok(self.log.last().expect("log is never empty"))
    }

    /// Discard the session and reset the log to the greeting. No remote
    /// side effect: the server offers no session teardown.
    pub fn clear(&mut self) {
        self.session = None;
        self.in_flight = None;
        self.log.clear();
    }

    fn settle(&mut self, placeholder_index: usize, turn: Turn) {
        self.log.replace(placeholder_index, turn);
        self.in_flight = None;
    }
}

fn describe_error(error: &PlatformError) -> String {
    match error {
        PlatformError::Authentication(detail) => {
            format!("Authentication failed: {}", detail)
        }
        PlatformError::ServiceUnavailable { detail, .. } => format!(
            "The data service is unavailable right now. Please try again in a moment. ({})",
            detail
        ),
        PlatformError::RateLimited => {
            "The data service is busy right now. Please try again in a moment.".to_string()
        }
        other => other.to_string(),
    }
}
