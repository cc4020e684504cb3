use thiserror::Error;

/// Failure taxonomy for the hosted platform services.
///
/// Everything the remote side can do wrong collapses into one of these
/// variants; callers decide what is terminal and what is retryable.
#[derive(Clone, Debug, Error)]
pub enum PlatformError {
    /// Credentials missing or rejected by the workspace.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// 5xx, transport failure, or request timeout.
    #[error("service unavailable: {detail}")]
    ServiceUnavailable { status: Option<u16>, detail: String },

    /// HTTP 429. The poller retries this once within the same call.
    #[error("rate limited by the service")]
    RateLimited,

    /// The engine reported FAILED for the submitted question.
    #[error("remote query failed: {0}")]
    RemoteQueryFailed(String),

    /// Local poll-attempt ceiling reached. The remote computation is
    /// abandoned, not cancelled.
    #[error("query timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    /// The response body could not be decoded at all.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl PlatformError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        PlatformError::ServiceUnavailable {
            status: None,
            detail: detail.into(),
        }
    }
}
