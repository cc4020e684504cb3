use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::api::{ContentRequest, CreateMessageResponse, MessageEnvelope, StartConversationResponse};
use super::{PollResult, QueryEngine, SessionHandle};
use crate::client::Http;
use crate::error::PlatformError;

/// Backoff before the single in-call retry after an HTTP 429.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Raw REST operations against one engine space. Split out from the engine
/// so the retry and resolution logic above it can be exercised with a
/// scripted transport.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn start_conversation(
        &self,
        content: &str,
    ) -> Result<StartConversationResponse, PlatformError>;

    async fn create_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<CreateMessageResponse, PlatformError>;

    async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<MessageEnvelope, PlatformError>;
}

struct RestTransport {
    http: Http,
    base_path: String,
}

#[async_trait]
impl EngineTransport for RestTransport {
    async fn start_conversation(
        &self,
        content: &str,
    ) -> Result<StartConversationResponse, PlatformError> {
        let path = format!("{}/start-conversation", self.base_path);
        self.http
            .post(&path, &ContentRequest { content: content.to_string() })
            .await
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<CreateMessageResponse, PlatformError> {
        let path = format!("{}/conversations/{}/messages", self.base_path, conversation_id);
        self.http
            .post(&path, &ContentRequest { content: content.to_string() })
            .await
    }

    async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<MessageEnvelope, PlatformError> {
        let path = format!(
            "{}/conversations/{}/messages/{}",
            self.base_path, conversation_id, message_id
        );
        self.http.get(&path).await
    }
}

#[async_trait]
impl EngineTransport for Box<dyn EngineTransport> {
    async fn start_conversation(
        &self,
        content: &str,
    ) -> Result<StartConversationResponse, PlatformError> {
        (**self).start_conversation(content).await
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<CreateMessageResponse, PlatformError> {
        (**self).create_message(conversation_id, content).await
    }

    async fn get_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<MessageEnvelope, PlatformError> {
        (**self).get_message(conversation_id, message_id).await
    }
}

/// Session client and status poller for the conversational engine.
pub struct RestQueryEngine<T: EngineTransport = Box<dyn EngineTransport>> {
    transport: T,
}

impl RestQueryEngine {
    pub fn new(host: &str, token: &str, space_id: &str) -> Result<Self, PlatformError> {
        let transport = RestTransport {
            http: Http::new(host, token)?,
            base_path: format!("/api/2.0/spaces/{}", space_id),
        };
        Ok(RestQueryEngine {
            transport: Box::new(transport),
        })
    }
}

impl<T: EngineTransport> RestQueryEngine<T> {
    pub fn with_transport(transport: T) -> Self {
        RestQueryEngine { transport }
    }
}

#[async_trait]
impl<T: EngineTransport> QueryEngine for RestQueryEngine<T> {
    async fn start_or_continue(
        &self,
        question: &str,
        existing_conversation_id: Option<&str>,
    ) -> Result<SessionHandle, PlatformError> {
        match existing_conversation_id {
            None => {
                let response = self.transport.start_conversation(question).await?;
                debug!(conversation_id = %response.conversation_id, "started conversation");
                Ok(SessionHandle {
                    conversation_id: response.conversation_id,
                    message_id: response.message_id,
                    question: question.to_string(),
                })
            }
            Some(conversation_id) => {
                let response = self.transport.create_message(conversation_id, question).await?;
                debug!(conversation_id, message_id = %response.id, "continued conversation");
                Ok(SessionHandle {
                    conversation_id: conversation_id.to_string(),
                    message_id: response.id,
                    question: question.to_string(),
                })
            }
        }
    }

    async fn poll(&self, handle: &SessionHandle) -> PollResult {
        let mut envelope = self
            .transport
            .get_message(&handle.conversation_id, &handle.message_id)
            .await;

        // One short delay-and-retry within the same call, for 429 only.
        if matches!(envelope, Err(PlatformError::RateLimited)) {
            warn!("rate limited while polling, retrying once");
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
            envelope = self
                .transport
                .get_message(&handle.conversation_id, &handle.message_id)
                .await;
        }

        match envelope {
            Ok(envelope) => envelope.resolve(&handle.question),
            Err(e) => PollResult::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlq::QueryStatus;
    use std::sync::Mutex;

    /// Transport that plays back a scripted sequence of get_message results
    /// and records every call.
    struct ScriptedTransport {
        statuses: Mutex<Vec<Result<MessageEnvelope, PlatformError>>>,
        get_calls: Mutex<u32>,
        starts: Mutex<u32>,
        continues: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(statuses: Vec<Result<MessageEnvelope, PlatformError>>) -> Self {
            ScriptedTransport {
                statuses: Mutex::new(statuses),
                get_calls: Mutex::new(0),
                starts: Mutex::new(0),
                continues: Mutex::new(Vec::new()),
            }
        }
    }

    fn completed_envelope(answer: &str) -> MessageEnvelope {
        serde_json::from_value(serde_json::json!({
            "status": "COMPLETED",
            "attachments": [ { "text": { "content": answer } } ],
        }))
        .unwrap()
    }

    #[async_trait]
    impl EngineTransport for ScriptedTransport {
        async fn start_conversation(
            &self,
            _content: &str,
        ) -> Result<StartConversationResponse, PlatformError> {
            *self.starts.lock().unwrap() += 1;
            Ok(serde_json::from_value(serde_json::json!({
                "conversation_id": "conv-1",
                "message_id": "msg-1",
            }))
            .unwrap())
        }

        async fn create_message(
            &self,
            conversation_id: &str,
            _content: &str,
        ) -> Result<CreateMessageResponse, PlatformError> {
            self.continues.lock().unwrap().push(conversation_id.to_string());
            Ok(serde_json::from_value(serde_json::json!({ "id": "msg-2" })).unwrap())
        }

        async fn get_message(
            &self,
            _conversation_id: &str,
            _message_id: &str,
        ) -> Result<MessageEnvelope, PlatformError> {
            *self.get_calls.lock().unwrap() += 1;
            self.statuses.lock().unwrap().remove(0)
        }
    }

    fn handle() -> SessionHandle {
        SessionHandle {
            conversation_id: "conv-1".to_string(),
            message_id: "msg-1".to_string(),
            question: "q".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_ask_starts_conversation() {
        let transport = ScriptedTransport::new(vec![]);
        let engine = RestQueryEngine::with_transport(transport);

        let handle = engine.start_or_continue("q", None).await.unwrap();
        assert_eq!(handle.conversation_id, "conv-1");
        assert_eq!(handle.message_id, "msg-1");
        assert_eq!(*engine.transport.starts.lock().unwrap(), 1);
        assert!(engine.transport.continues.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subsequent_ask_sends_message_in_conversation() {
        let transport = ScriptedTransport::new(vec![]);
        let engine = RestQueryEngine::with_transport(transport);

        let handle = engine.start_or_continue("q2", Some("conv-9")).await.unwrap();
        assert_eq!(handle.conversation_id, "conv-9");
        assert_eq!(handle.message_id, "msg-2");
        assert_eq!(*engine.transport.starts.lock().unwrap(), 0);
        assert_eq!(
            engine.transport.continues.lock().unwrap().as_slice(),
            &["conv-9".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_exactly_once() {
        let transport = ScriptedTransport::new(vec![
            Err(PlatformError::RateLimited),
            Ok(completed_envelope("done")),
        ]);
        let engine = RestQueryEngine::with_transport(transport);

        let result = engine.poll(&handle()).await;
        assert_eq!(result.status, QueryStatus::Completed);
        assert_eq!(result.answer.as_deref(), Some("done"));
        assert_eq!(*engine.transport.get_calls.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_fails_after_one_retry() {
        let transport = ScriptedTransport::new(vec![
            Err(PlatformError::RateLimited),
            Err(PlatformError::RateLimited),
        ]);
        let engine = RestQueryEngine::with_transport(transport);

        let result = engine.poll(&handle()).await;
        assert_eq!(result.status, QueryStatus::Failed);
        assert!(result.error.is_some());
        assert_eq!(*engine.transport.get_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_folds_into_failed_result() {
        let transport =
            ScriptedTransport::new(vec![Err(PlatformError::unavailable("connection reset"))]);
        let engine = RestQueryEngine::with_transport(transport);

        let result = engine.poll(&handle()).await;
        assert_eq!(result.status, QueryStatus::Failed);
        assert!(result.error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_poll_is_idempotent_while_non_terminal() {
        let pending: MessageEnvelope =
            serde_json::from_value(serde_json::json!({ "status": "QUERY_GENERATION" })).unwrap();
        let transport =
            ScriptedTransport::new(vec![Ok(pending.clone()), Ok(pending)]);
        let engine = RestQueryEngine::with_transport(transport);

        let first = engine.poll(&handle()).await;
        let second = engine.poll(&handle()).await;
        assert_eq!(first.status, QueryStatus::Generating);
        assert_eq!(second.status, first.status);
        assert_eq!(second.message, first.message);
    }
}
