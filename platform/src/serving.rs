//! LLM serving endpoint: a single-turn, non-conversational chat call used
//! by the allocation recommendation feature.

use serde::{Deserialize, Serialize};

use crate::client::Http;
use crate::error::PlatformError;

const DEFAULT_MAX_TOKENS: u32 = 3000;

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct ChatMessage {
    role: Role,
    content: String,
}

#[derive(Clone, Debug, Serialize)]
struct InvocationRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Clone, Debug, Deserialize)]
struct InvocationResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Clone, Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub struct ServingClient {
    http: Http,
    endpoint: String,
}

impl ServingClient {
    pub fn new(host: &str, token: &str, endpoint: &str) -> Result<Self, PlatformError> {
        Ok(ServingClient {
            http: Http::new(host, token)?,
            endpoint: endpoint.to_string(),
        })
    }

    /// One system+user turn, first choice's content back.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, PlatformError> {
        let request = InvocationRequest {
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: system.to_string(),
                },
                ChatMessage {
                    role: Role::User,
                    content: user.to_string(),
                },
            ],
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        let path = format!("/serving-endpoints/{}/invocations", self.endpoint);
        let response: InvocationResponse = self.http.post(&path, &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PlatformError::Malformed("response contained no choices".to_string()))
    }
}
