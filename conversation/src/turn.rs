//! The locally displayed chat log: an append-only sequence of turns.

use serde::{Deserialize, Serialize};

/// Who is speaking in a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

impl TurnRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the chat log. Final turns are never mutated; the only
/// in-place change the log performs is swapping the pending placeholder for
/// the terminal answer and stamping the conversation id once it is known.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,

    /// SQL the engine used to answer, when it shared one.
    pub sql: Option<String>,

    /// Remote conversation this turn belongs to, once assigned.
    pub conversation_id: Option<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn {
            role: TurnRole::User,
            text: text.into(),
            sql: None,
            conversation_id: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Turn {
            role: TurnRole::Assistant,
            text: text.into(),
            sql: None,
            conversation_id: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Turn {
            role: TurnRole::System,
            text: text.into(),
            sql: None,
            conversation_id: None,
        }
    }

    pub fn with_sql(mut self, sql: Option<String>) -> Self {
        self.sql = sql;
        self
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}

/// Greeting shown when a conversation begins or is cleared.
pub const GREETING: &str = "\
Hello! I'm your AI assistant for supply chain inventory.

I can answer questions about your actual data, for example:
- Which sites have low stock or outages?
- What parts need immediate reordering?
- Show all out-of-stock items at Brisbane Mine
- Which parts are below safety stock?

Responses can take a few seconds while the query runs.";

/// Ordered, chronological turn log for one UI session.
#[derive(Clone, Debug)]
pub struct TurnLog {
    turns: Vec<Turn>,
}

impl TurnLog {
    /// A fresh log holds the synthetic greeting.
    pub fn new() -> Self {
        TurnLog {
            turns: vec![Turn::assistant(GREETING)],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Append a turn; returns its index.
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// Replace the turn at `index` in place. Used to swap the pending
    /// placeholder for the terminal answer, not to rewrite history.
    pub fn replace(&mut self, index: usize, turn: Turn) {
        self.turns[index] = turn;
    }

    /// Stamp a conversation id onto the turn at `index` if it has none yet.
    pub fn assign_conversation_id(&mut self, index: usize, id: &str) {
        let turn = &mut self.turns[index];
        if turn.conversation_id.is_none() {
            turn.conversation_id = Some(id.to_string());
        }
    }

    /// Reset to the single greeting turn.
    pub fn clear(&mut self) {
        self.turns = vec![Turn::assistant(GREETING)];
    }
}

impl Default for TurnLog {
    fn default() -> Self {
        Self::new()
    }
}
