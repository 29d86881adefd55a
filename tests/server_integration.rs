use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use futures::{StreamExt, stream};
use serde_json::{Value, json};
use stream_chat::AppState;
use stream_chat::config::AppConfig;
use stream_chat::llm::{AnswerSource, TextStream};
use stream_chat::server::{FALLBACK_ANSWER, router};

enum Script {
    Deltas(Vec<&'static str>),
    FailBeforeStart,
    FailAfter(Vec<&'static str>),
}

struct ScriptedSource(Script);

#[async_trait::async_trait]
impl AnswerSource for ScriptedSource {
    async fn answer(&self, _query: &str) -> anyhow::Result<TextStream> {
        let ok = |d: &Vec<&'static str>| {
            d.iter()
                .map(|s| Ok((*s).to_string()))
                .collect::<Vec<anyhow::Result<String>>>()
        };
        match &self.0 {
            Script::Deltas(d) => Ok(stream::iter(ok(d)).boxed()),
            Script::FailBeforeStart => anyhow::bail!("model unavailable"),
            Script::FailAfter(d) => {
                let mut items = ok(d);
                items.push(Err(anyhow::anyhow!("connection reset")));
                Ok(stream::iter(items).boxed())
            }
        }
    }
}

fn test_server(script: Script, static_dir: &std::path::Path) -> TestServer {
    let mut config = AppConfig::load_from_args(["stream-chat"]).unwrap();
    config.server.static_dir = static_dir.to_path_buf();

    let state = AppState {
        answers: Arc::new(ScriptedSource(script)),
        config: Arc::new(config),
    };
    TestServer::new(router(state)).unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(Script::Deltas(vec![]), dir.path());

    let response = server.get("/api/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_blank_query_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(Script::Deltas(vec!["unused"]), dir.path());

    let response = server
        .post("/api/chat-stream")
        .json(&json!({ "query": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_answer_streamed_as_plain_text() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(Script::Deltas(vec!["# Hi", "\nthere"]), dir.path());

    let response = server
        .post("/api/chat-stream")
        .json(&json!({ "query": "hello" }))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.text(), "# Hi\nthere");
}

#[tokio::test]
async fn test_source_error_before_start_streams_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(Script::FailBeforeStart, dir.path());

    let response = server
        .post("/api/chat-stream")
        .json(&json!({ "query": "hello" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), FALLBACK_ANSWER);
}

#[tokio::test]
async fn test_mid_stream_error_ends_with_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(Script::FailAfter(vec!["Partial "]), dir.path());

    let response = server
        .post("/api/chat-stream")
        .json(&json!({ "query": "hello" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), format!("Partial {FALLBACK_ANSWER}"));
}

#[tokio::test]
async fn test_index_served_at_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<form id=\"chat-form\"></form>").unwrap();
    std::fs::write(dir.path().join("style.css"), "body {}").unwrap();
    let server = test_server(Script::Deltas(vec![]), dir.path());

    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("chat-form"));

    let response = server.get("/static/style.css").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "body {}");
}
