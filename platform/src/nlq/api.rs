//! Wire format for the conversational engine REST API.
//!
//! The documented response schema is mapped onto a closed set of variants.
//! Anything the engine sends that we do not recognize lands in an explicit
//! `Unrecognized` arm instead of being probed field by field.

use serde::{Deserialize, Serialize};

use super::{PollResult, QueryStatus};

pub(crate) const FALLBACK_ANSWER: &str = "Query completed. Check the source for results.";

#[derive(Clone, Debug, Serialize)]
pub(crate) struct ContentRequest {
    pub(crate) content: String,
}

/// `POST .../start-conversation` allocates both ids at once.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct StartConversationResponse {
    pub(crate) conversation_id: String,
    pub(crate) message_id: String,

    #[serde(flatten)]
    pub(crate) extra: serde_json::Value,
}

/// `POST .../conversations/{id}/messages` returns only the new message id.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CreateMessageResponse {
    pub(crate) id: String,

    #[serde(flatten)]
    pub(crate) extra: serde_json::Value,
}

/// Engine processing states as they appear on the wire. Everything not in
/// the documented set is treated as still pending.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum RawStatus {
    QueryGeneration,
    ExecutingQuery,
    Completed,
    Failed,

    #[serde(other)]
    Other,
}

impl From<RawStatus> for QueryStatus {
    fn from(raw: RawStatus) -> Self {
        match raw {
            RawStatus::QueryGeneration => QueryStatus::Generating,
            RawStatus::ExecutingQuery => QueryStatus::Executing,
            RawStatus::Completed => QueryStatus::Completed,
            RawStatus::Failed => QueryStatus::Failed,
            RawStatus::Other => QueryStatus::Pending,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct TextContent {
    pub(crate) content: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct QueryContent {
    #[serde(default)]
    pub(crate) query: Option<String>,

    #[serde(default)]
    pub(crate) description: Option<String>,
}

/// One response attachment. The engine marks the kind by which field is
/// present, so the variants are matched untagged, with a trailing catch-all
/// for shapes introduced after this client was written.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub(crate) enum Attachment {
    Text { text: TextContent },
    Query { query: QueryContent },
    Unrecognized(serde_json::Value),
}

/// `GET .../messages/{id}`: current status plus, once complete, the answer
/// material.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MessageEnvelope {
    pub(crate) status: RawStatus,

    #[serde(default)]
    pub(crate) attachments: Vec<Attachment>,

    #[serde(default)]
    pub(crate) description: Option<String>,

    #[serde(default)]
    pub(crate) error: Option<String>,

    #[serde(flatten)]
    pub(crate) extra: serde_json::Value,
}

impl MessageEnvelope {
    /// Collapse the envelope into a `PollResult` for the question that
    /// produced it.
    pub(crate) fn resolve(&self, question: &str) -> PollResult {
        let status = QueryStatus::from(self.status);
        match status {
            QueryStatus::Failed => {
                PollResult::failed(self.error.clone().unwrap_or_else(|| "Query failed".to_string()))
            }
            QueryStatus::Completed => PollResult {
                status,
                message: None,
                answer: Some(self.extract_answer(question)),
                sql: self.extract_sql(),
                error: None,
            },
            _ => PollResult::in_progress(status),
        }
    }

    /// Answer precedence: a text attachment that is not just the question
    /// echoed back, then a query attachment's description, then the
    /// envelope's own description, then a fixed fallback.
    fn extract_answer(&self, question: &str) -> String {
        let text = self.attachments.iter().find_map(|a| match a {
            Attachment::Text { text } if !text.content.is_empty() && text.content != question => {
                Some(text.content.clone())
            }
            _ => None,
        });
        if let Some(text) = text {
            return text;
        }

        let described = self.attachments.iter().find_map(|a| match a {
            Attachment::Query { query } => query
                .description
                .as_ref()
                .filter(|d| !d.is_empty() && d.as_str() != question)
                .cloned(),
            _ => None,
        });
        if let Some(described) = described {
            return described;
        }

        self.description
            .as_ref()
            .filter(|d| !d.is_empty() && d.as_str() != question)
            .cloned()
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string())
    }

    /// The SQL travels in a query attachment. Its absence is not an error;
    /// not every answer needs a query.
    fn extract_sql(&self) -> Option<String> {
        self.attachments.iter().find_map(|a| match a {
            Attachment::Query { query } => query.query.clone().filter(|q| !q.is_empty()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: serde_json::Value) -> MessageEnvelope {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        for (wire, expected) in [
            ("QUERY_GENERATION", QueryStatus::Generating),
            ("EXECUTING_QUERY", QueryStatus::Executing),
            ("COMPLETED", QueryStatus::Completed),
            ("FAILED", QueryStatus::Failed),
            ("SUBMITTED", QueryStatus::Pending),
            ("SOMETHING_NEW", QueryStatus::Pending),
        ] {
            let env = envelope(serde_json::json!({ "status": wire }));
            assert_eq!(QueryStatus::from(env.status), expected, "status {}", wire);
        }
    }

    #[test]
    fn test_completed_prefers_distinct_text_attachment() {
        let env = envelope(serde_json::json!({
            "status": "COMPLETED",
            "attachments": [
                { "query": { "query": "SELECT 1", "description": "counts rows" } },
                { "text": { "content": "There are 12 sites below safety stock." } },
            ],
        }));

        let result = env.resolve("How many sites are below safety stock?");
        assert_eq!(result.status, QueryStatus::Completed);
        assert_eq!(
            result.answer.as_deref(),
            Some("There are 12 sites below safety stock.")
        );
        assert_eq!(result.sql.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_answer_independent_of_attachment_order() {
        let question = "low stock parts?";
        let text = serde_json::json!({ "text": { "content": "Three parts are low." } });
        let echo = serde_json::json!({ "text": { "content": question } });
        let query = serde_json::json!({ "query": { "description": "lists parts" } });

        for attachments in [
            vec![echo.clone(), query.clone(), text.clone()],
            vec![query.clone(), text.clone(), echo.clone()],
            vec![text, echo, query],
        ] {
            let env = envelope(serde_json::json!({
                "status": "COMPLETED",
                "attachments": attachments,
            }));
            assert_eq!(
                env.resolve(question).answer.as_deref(),
                Some("Three parts are low.")
            );
        }
    }

    #[test]
    fn test_echoed_question_falls_back_to_query_description() {
        let question = "total shortage quantity?";
        let env = envelope(serde_json::json!({
            "status": "COMPLETED",
            "attachments": [
                { "text": { "content": question } },
                { "query": { "query": "SELECT sum(shortage_quantity) FROM inv", "description": "Total shortage across sites" } },
            ],
        }));

        let result = env.resolve(question);
        assert_eq!(result.answer.as_deref(), Some("Total shortage across sites"));
        assert!(result.sql.as_deref().unwrap().starts_with("SELECT sum"));
    }

    #[test]
    fn test_unrecognized_attachments_degrade_to_fallback() {
        let env = envelope(serde_json::json!({
            "status": "COMPLETED",
            "attachments": [
                { "statement_execution_result": { "rows": 4 } },
            ],
        }));

        let result = env.resolve("anything");
        assert_eq!(result.status, QueryStatus::Completed);
        assert_eq!(result.answer.as_deref(), Some(FALLBACK_ANSWER));
        assert!(result.sql.is_none());
    }

    #[test]
    fn test_missing_sql_is_not_an_error() {
        let env = envelope(serde_json::json!({
            "status": "COMPLETED",
            "attachments": [ { "text": { "content": "All good." } } ],
        }));

        let result = env.resolve("q");
        assert_eq!(result.answer.as_deref(), Some("All good."));
        assert!(result.sql.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_failed_carries_engine_error_text() {
        let env = envelope(serde_json::json!({
            "status": "FAILED",
            "error": "table not found",
        }));

        let result = env.resolve("q");
        assert_eq!(result.status, QueryStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("table not found"));
    }

    #[test]
    fn test_envelope_description_used_before_fallback() {
        let env = envelope(serde_json::json!({
            "status": "COMPLETED",
            "attachments": [],
            "description": "Query returned 8 rows.",
        }));

        assert_eq!(env.resolve("q").answer.as_deref(), Some("Query returned 8 rows."));
    }

    #[test]
    fn test_in_progress_has_progress_text() {
        let env = envelope(serde_json::json!({ "status": "EXECUTING_QUERY" }));
        let result = env.resolve("q");
        assert_eq!(result.status, QueryStatus::Executing);
        assert_eq!(result.message.as_deref(), Some("Executing query on your data..."));
        assert!(result.answer.is_none());
    }
}
