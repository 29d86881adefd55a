//! Request dispatch to the streaming chat endpoint.

use std::pin::Pin;

use axum::body::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ChatError, Result};

/// Response body as a sequence of raw chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// JSON body sent to the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    /// The user's question.
    pub query: String,
}

/// Opens one streamed answer per query.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `query` and return the response body once the status is known.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Status`] for a non-success status and
    /// [`ChatError::Transport`] when the request cannot be sent.
    async fn open(&self, query: &str) -> Result<ByteStream>;
}

/// [`ChatTransport`] posting to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport for `endpoint`, e.g. `http://localhost:8001/api/chat-stream`.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: Url::parse(endpoint.as_ref())?,
        })
    }

    /// The endpoint requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, query: &str) -> Result<ByteStream> {
        let body = ChatStreamRequest {
            query: query.to_string(),
        };

        tracing::debug!(endpoint = %self.endpoint, "Posting chat query");

        // `.json()` sets `Content-Type: application/json`.
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        Ok(response.bytes_stream().map_err(ChatError::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parsed() {
        let transport = HttpTransport::new("http://localhost:8001/api/chat-stream").unwrap();
        assert_eq!(transport.endpoint().path(), "/api/chat-stream");
        assert_eq!(transport.endpoint().port(), Some(8001));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = HttpTransport::new("not a url").unwrap_err();
        assert!(matches!(err, ChatError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ChatStreamRequest {
            query: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "query": "hello" }));
    }
}
