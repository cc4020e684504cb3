use platform::SessionHandle;

/// Per-UI-session record of the remote conversation. Created on the first
/// ask, updated on every subsequent one, discarded on clear. Lives only in
/// process memory.
#[derive(Clone, Debug)]
pub struct ConversationSession {
    /// Allocated by the engine on the first turn.
    pub conversation_id: Option<String>,
    pub last_message_id: String,
    /// Poll cycles spent on the current question. Monotonically
    /// non-decreasing until the next ask resets it.
    pub poll_attempts: u32,
    /// The question currently (or most recently) in flight.
    pub question: String,
}

impl ConversationSession {
    /// Record a newly submitted question. `poll_attempts` starts at zero
    /// exactly when an ask begins.
    pub fn begin(handle: &SessionHandle) -> Self {
        ConversationSession {
            conversation_id: Some(handle.conversation_id.clone()),
            last_message_id: handle.message_id.clone(),
            poll_attempts: 0,
            question: handle.question.clone(),
        }
    }

    /// Count one poll cycle and return the new total.
    pub fn record_attempt(&mut self) -> u32 {
        self.poll_attempts += 1;
        self.poll_attempts
    }
}
