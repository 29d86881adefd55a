//! `OpenAI` Chat Completions answer source.
//!
//! Posts the query to `/v1/chat/completions` with `stream: true` and turns
//! the server-sent events into plain text deltas.

use futures::StreamExt;

use super::{AnswerSource, LlmSettings, TextStream};

/// One parsed SSE `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Delta(String),
    Done,
}

/// Answer source backed by the Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsSource {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsSource")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsSource {
    /// Create a source with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn request_body(&self, query: &str) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.settings.system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": query }));

        serde_json::json!({
            "model": self.settings.model,
            "stream": true,
            "messages": messages,
        })
    }
}

#[async_trait::async_trait]
impl AnswerSource for ChatCompletionsSource {
    async fn answer(&self, query: &str) -> anyhow::Result<TextStream> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let mut rb = self.http.post(&url).json(&self.request_body(query));
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb.send().await?.error_for_status()?;
        let byte_stream = resp.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();
            let mut done = false;

            futures::pin_mut!(byte_stream);
            'read: while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                buf.extend_from_slice(&chunk);

                while let Some((pos, delim)) = find_frame_end(&buf) {
                    let frame = buf.drain(..pos + delim).collect::<Vec<_>>();
                    for event in parse_frame(&frame)? {
                        match event {
                            SseEvent::Delta(text) => yield text,
                            SseEvent::Done => {
                                done = true;
                                break 'read;
                            }
                        }
                    }
                }
            }

            // Last frame without a trailing blank line
            if !done && !buf.is_empty() {
                for event in parse_frame(&buf)? {
                    if let SseEvent::Delta(text) = event {
                        yield text;
                    }
                }
            }
        };

        Ok(Box::pin(out))
    }
}

/// Parse every `data:` line of one SSE frame.
fn parse_frame(frame: &[u8]) -> anyhow::Result<Vec<SseEvent>> {
    let text = String::from_utf8_lossy(frame);
    let mut events = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();

        if data == "[DONE]" {
            events.push(SseEvent::Done);
            break;
        }

        let v: serde_json::Value = serde_json::from_str(data)?;
        if let Some(s) = v["choices"][0]["delta"]["content"].as_str()
            && !s.is_empty()
        {
            events.push(SseEvent::Delta(s.to_string()));
        }
    }

    Ok(events)
}

/// Find the end of the first frame: its blank-line position and delimiter length.
///
/// Accepts both `\n\n` and `\r\n\r\n` delimiters.
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(system_prompt: Option<&str>) -> LlmSettings {
        LlmSettings {
            base_url: "http://localhost:11434/".to_string(),
            api_key: None,
            model: "test-model".to_string(),
            system_prompt: system_prompt.map(ToString::to_string),
        }
    }

    #[test]
    fn test_parse_frame_content_and_done() {
        let frame = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: [DONE]\n\n";
        let events = parse_frame(frame).unwrap();
        assert_eq!(
            events,
            vec![SseEvent::Delta("Hel".to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn test_parse_frame_skips_role_and_comments() {
        let frame = b": keep-alive\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n";
        assert!(parse_frame(frame).unwrap().is_empty());
    }

    #[test]
    fn test_parse_frame_rejects_bad_json() {
        assert!(parse_frame(b"data: {not json\n\n").is_err());
    }

    #[test]
    fn test_find_frame_end() {
        assert_eq!(find_frame_end(b"data: x\n\nrest"), Some((7, 2)));
        assert_eq!(find_frame_end(b"data: x\r\n\r\nrest"), Some((7, 4)));
        assert_eq!(find_frame_end(b"data: x\r\n\r\ndata: y\n\n"), Some((7, 4)));
        assert_eq!(find_frame_end(b"data: x\n"), None);
    }

    #[test]
    fn test_parse_crlf_frame() {
        let frame = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\r\n\r\n";
        assert_eq!(parse_frame(frame).unwrap(), vec![SseEvent::Delta("Hi".to_string())]);
    }

    #[tokio::test]
    async fn test_crlf_stream_and_unterminated_last_frame() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\r\n\r\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}";
        let addr = serve_sse(body).await;
        let mut s = settings(None);
        s.base_url = format!("http://{addr}");

        let deltas: Vec<String> = ChatCompletionsSource::new(s)
            .answer("hi")
            .await
            .unwrap()
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["Hel".to_string(), "lo".to_string()]);
    }

    async fn serve_sse(body: &'static str) -> std::net::SocketAddr {
        let app = axum::Router::new().route(
            "/v1/chat/completions",
            axum::routing::post(move || async move {
                ([(axum::http::header::CONTENT_TYPE, "text/event-stream")], body)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_request_body_includes_system_prompt() {
        let source = ChatCompletionsSource::new(settings(Some("Answer briefly.")));
        let body = source.request_body("hi");
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");

        let source = ChatCompletionsSource::new(settings(None));
        let body = source.request_body("hi");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }
}
