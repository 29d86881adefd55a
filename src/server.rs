use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, get_service, post},
};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;

use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::llm::{AnswerSource, ChatCompletionsSource, LlmSettings};
use crate::transport::ChatStreamRequest;

/// Streamed in place of the answer when the source fails.
pub const FALLBACK_ANSWER: &str = "Sorry, an error occurred while generating the answer.";

const HEALTH_MESSAGE: &str = "KNOU chatbot server is running.";
const BLANK_QUERY_DETAIL: &str = "Please enter a question.";
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: LlmSettings) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        "LLM configuration loaded"
    );

    let answers: Arc<dyn AnswerSource> = Arc::new(ChatCompletionsSource::new(settings));
    let state = AppState {
        answers,
        config: Arc::clone(&config),
    };
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        static_dir = %config.server.static_dir.display(),
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let static_dir = &state.config.server.static_dir;

    Router::new()
        .route(
            "/",
            get_service(ServeFile::new(static_dir.join("index.html"))),
        )
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/api/chat-stream", post(chat_stream))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    message: &'static str,
}

/// POST /api/chat-stream - Stream the answer as plain text.
async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatStreamRequest>,
) -> Response {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                detail: BLANK_QUERY_DETAIL,
            }),
        )
            .into_response();
    }

    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        query_length = query.len(),
        "Received chat query"
    );

    let answers = Arc::clone(&state.answers);
    let text_stream = async_stream::stream! {
        let mut deltas = match answers.answer(&query).await {
            Ok(deltas) => deltas,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Answer source failed");
                yield Ok::<String, std::convert::Infallible>(FALLBACK_ANSWER.to_string());
                return;
            }
        };

        let mut sent = 0usize;
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(text) => {
                    sent += text.len();
                    yield Ok(text);
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        error = %e,
                        bytes_sent = sent,
                        "Answer stream failed"
                    );
                    yield Ok(FALLBACK_ANSWER.to_string());
                    return;
                }
            }
        }

        tracing::info!(request_id = %request_id, bytes_sent = sent, "Stream complete");
    };

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(text_stream),
    )
        .into_response()
}

/// GET /api/health - Liveness probe.
async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        message: HEALTH_MESSAGE,
    })
}
