//! The chat controller: submission, streamed rendering, input toggling.
//!
//! [`ChatController`] owns the transcript and drives an injected
//! [`ChatView`] while it consumes answers from an injected
//! [`ChatTransport`]. One stream session runs at a time: `submit` borrows
//! the controller mutably for the whole exchange and the view's input stays
//! disabled until it ends.
//!
//! # Example
//!
//! ```rust,no_run
//! use stream_chat::controller::{ChatController, ControllerOptions};
//! use stream_chat::transport::HttpTransport;
//! use stream_chat::view::HtmlView;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new("http://localhost:8001/api/chat-stream")?;
//! let mut chat = ChatController::new(HtmlView::new(), transport, ControllerOptions::default());
//!
//! chat.view_mut().set_input_value("What changed this semester?");
//! chat.submit().await;
//! println!("{}", chat.view().chat_box_html());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use crate::decode::Utf8StreamDecoder;
use crate::error::{ChatError, Result};
use crate::markdown::render_markdown;
use crate::transcript::{MessageId, MessageState, Role, Transcript};
use crate::transport::ChatTransport;
use crate::view::{ChatView, Content, InputHeight, Key, KeyPress, NodeId};

/// Notice shown in place of an answer when the stream fails.
pub const DEFAULT_ERROR_NOTICE: &str = "Sorry, something went wrong.\nPlease try again in a moment.";

/// Tunables for a [`ChatController`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Upper bound for opening the response and for every chunk read.
    /// `None` waits indefinitely.
    pub read_timeout: Option<Duration>,
    /// Text replacing the bot message when a stream fails.
    pub error_notice: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            read_timeout: None,
            error_notice: DEFAULT_ERROR_NOTICE.to_string(),
        }
    }
}

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input (or input disabled); nothing happened.
    Ignored,
    /// The answer streamed to completion.
    Completed,
    /// The request or stream failed; the error notice is shown.
    Failed,
    /// The session was aborted; the partial answer is shown.
    Cancelled,
}

/// Result of a keydown on the text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not handled; the view performs its default action.
    Default,
    /// Default prevented and the form submitted.
    Submitted(SubmitOutcome),
}

/// Cloneable handle that aborts the active stream session.
///
/// Safe to move to other tasks, e.g. a Ctrl-C listener.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl AbortHandle {
    /// Abort the active session. Returns `false` when nothing is streaming.
    pub fn abort(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a session is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn install(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        token
    }

    fn clear(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

/// One in-flight request/response exchange.
#[derive(Debug)]
struct StreamSession {
    id: Uuid,
    message: MessageId,
    node: NodeId,
    answer: String,
    decoder: Utf8StreamDecoder,
    chunks: usize,
    bytes: usize,
}

impl StreamSession {
    fn new(message: MessageId, node: NodeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            node,
            answer: String::new(),
            decoder: Utf8StreamDecoder::new(),
            chunks: 0,
            bytes: 0,
        }
    }
}

/// Chat UI controller.
#[derive(Debug)]
pub struct ChatController<V, T> {
    view: V,
    transport: T,
    transcript: Transcript,
    input_enabled: bool,
    abort: AbortHandle,
    options: ControllerOptions,
}

impl<V: ChatView, T: ChatTransport> ChatController<V, T> {
    /// Attach a controller to `view`, sending queries through `transport`.
    pub fn new(view: V, transport: T, options: ControllerOptions) -> Self {
        Self {
            view,
            transport,
            transcript: Transcript::new(),
            input_enabled: true,
            abort: AbortHandle::default(),
            options,
        }
    }

    /// The attached view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Mutable access to the attached view (e.g. to type into the input).
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Detach and return the view.
    pub fn into_view(self) -> V {
        self.view
    }

    /// Messages of this session.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Whether a new submission would be accepted.
    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Handle for aborting the active session from elsewhere.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Form submission: submit the current input value.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let value = self.view.input_value();
        self.submit_query(&value).await
    }

    /// Submit `query` and stream its answer into a new bot message.
    ///
    /// Blank queries are ignored. Failures never escape: they are logged and
    /// shown as the error notice. Input is re-enabled and focused on every
    /// path that started a session.
    pub async fn submit_query(&mut self, query: &str) -> SubmitOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SubmitOutcome::Ignored;
        }
        if !self.input_enabled {
            debug!("Submission while input disabled ignored");
            return SubmitOutcome::Ignored;
        }

        self.transcript.push_user(query);
        self.append_message(Role::User, Content::Text(query));
        self.view.clear_input();
        self.view.set_input_height(InputHeight::Auto);

        let message = self.transcript.push_bot();
        let node = self.append_message(Role::Bot, Content::Loading);
        self.toggle_input(false);

        let mut session = StreamSession::new(message, node);
        let started = Instant::now();
        info!(
            session_id = %session.id,
            query_length = query.len(),
            "Chat stream started"
        );

        let token = self.abort.install();
        let result = tokio::select! {
            () = token.cancelled() => Err(ChatError::Cancelled),
            res = self.stream_answer(query, &mut session) => res,
        };
        self.abort.clear();

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = match result {
            Ok(()) => {
                self.transcript.set_state(message, MessageState::Complete);
                info!(
                    session_id = %session.id,
                    chunks = session.chunks,
                    bytes = session.bytes,
                    elapsed_ms,
                    "Chat stream complete"
                );
                SubmitOutcome::Completed
            }
            Err(ChatError::Cancelled) => {
                let opened = self
                    .transcript
                    .get(message)
                    .is_some_and(|m| m.state != MessageState::Pending);
                if !opened {
                    self.view.set_content(node, Content::Empty);
                }
                self.transcript.set_state(message, MessageState::Cancelled);
                info!(
                    session_id = %session.id,
                    chunks = session.chunks,
                    elapsed_ms,
                    "Chat stream cancelled"
                );
                SubmitOutcome::Cancelled
            }
            Err(e) => {
                error!(
                    session_id = %session.id,
                    error = %e,
                    chunks = session.chunks,
                    elapsed_ms,
                    "Chat stream failed"
                );
                self.view.set_content(node, Content::Error(&self.options.error_notice));
                self.transcript.set_state(message, MessageState::Failed);
                SubmitOutcome::Failed
            }
        };

        self.view.scroll_to_bottom();
        self.toggle_input(true);
        outcome
    }

    /// Input event: grow or shrink the input to fit its content.
    pub fn on_input_changed(&mut self) {
        self.view.set_input_height(InputHeight::Auto);
        let height = self.view.input_scroll_height();
        self.view.set_input_height(InputHeight::Pixels(height));
    }

    /// Keydown on the input. Enter submits; Shift+Enter keeps the default
    /// (a newline).
    pub async fn on_key_down(&mut self, key: KeyPress) -> KeyOutcome {
        if key.key == Key::Enter && !key.shift {
            KeyOutcome::Submitted(self.submit().await)
        } else {
            KeyOutcome::Default
        }
    }

    /// Enable or disable the input and send controls together.
    pub fn toggle_input(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        self.view.set_controls_disabled(!enabled);
        if enabled {
            self.view.focus_input();
        }
    }

    /// Append a transcript entry to the view and keep it in sight.
    pub fn append_message(&mut self, role: Role, content: Content<'_>) -> NodeId {
        let node = self.view.append_message(role, content);
        self.view.scroll_to_bottom();
        node
    }

    async fn stream_answer(&mut self, query: &str, session: &mut StreamSession) -> Result<()> {
        let limit = self.options.read_timeout;
        let mut body = within(limit, self.transport.open(query)).await??;

        self.transcript.set_state(session.message, MessageState::Streaming);
        // The loading indicator goes away as soon as the response opens.
        self.view.set_content(session.node, Content::Empty);

        while let Some(chunk) = within(limit, body.next()).await? {
            let chunk = chunk?;
            session.chunks += 1;
            session.bytes += chunk.len();
            let text = session.decoder.decode(&chunk);
            trace!(
                session_id = %session.id,
                chunk_length = chunk.len(),
                text_length = text.len(),
                "Chunk received"
            );
            self.push_text(session, &text);
        }

        let tail = session.decoder.finish();
        if !tail.is_empty() {
            self.push_text(session, &tail);
        }
        Ok(())
    }

    /// Grow the answer and re-render all of it.
    fn push_text(&mut self, session: &mut StreamSession, text: &str) {
        session.answer.push_str(text);
        self.transcript.append(session.message, text);
        let html = render_markdown(&session.answer);
        self.view.set_content(
            session.node,
            Content::Markdown {
                source: &session.answer,
                html: &html,
            },
        );
        self.view.scroll_to_bottom();
    }
}

async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_elapsed| ChatError::TimedOut(limit)),
        None => Ok(fut.await),
    }
}
