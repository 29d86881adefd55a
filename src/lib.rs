//! Streaming chat
//!
//! A chat client that sends a question to a streaming endpoint and renders
//! the answer as markdown while it arrives, plus the server that hosts the
//! chat page and produces the answers.
//!
//! # Architecture
//!
//! - **Controller**: submission, streamed rendering and input toggling
//! - **Views**: the page model (HTML) and a terminal front end
//! - **Server**: Axum endpoint streaming answer text as chunked `text/plain`
//! - **LLM**: Chat Completions answer source
//!
//! # Modules
//!
//! - [`controller`]: the chat UI controller
//! - [`view`]: display surfaces the controller drives
//! - [`transport`]: request dispatch to the streaming endpoint
//! - [`decode`]: incremental UTF-8 decoding of the byte stream
//! - [`markdown`]: markdown rendering and HTML escaping
//! - [`transcript`]: in-memory message history
//! - [`llm`]: answer sources for the server

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod controller;
pub mod decode;
pub mod error;
pub mod llm;
pub mod markdown;
pub mod server;
pub mod transcript;
pub mod transport;
pub mod view;

use crate::config::AppConfig;

use llm::AnswerSource;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Produces the streamed answers.
    pub answers: Arc<dyn AnswerSource>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish()
    }
}
