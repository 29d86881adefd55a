//! Conversation transcript for the current session.
//!
//! The transcript is memory-only: messages are appended, bot messages grow
//! as their answer streams in, and nothing is ever removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing into the input.
    User,
    /// The remote answering service.
    Bot,
}

/// Lifecycle of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Final text; user messages start here.
    Complete,
    /// Bot placeholder waiting for the response to open.
    Pending,
    /// Bot message receiving chunks.
    Streaming,
    /// The stream failed; the partial answer was discarded.
    Failed,
    /// The stream was aborted; the partial answer is kept.
    Cancelled,
}

/// Index of a message within its [`Transcript`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(usize);

/// A rendered conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Raw text for users, accumulated markdown source for the bot.
    pub text: String,
    /// Current lifecycle state.
    pub state: MessageState,
    /// When the message was appended.
    pub created_at: DateTime<Utc>,
}

/// Ordered list of messages shown for the current session.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message.
    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::User, text.into(), MessageState::Complete)
    }

    /// Append an empty bot message awaiting its answer.
    pub fn push_bot(&mut self) -> MessageId {
        self.push(Role::Bot, String::new(), MessageState::Pending)
    }

    /// Append decoded answer text to a bot message.
    ///
    /// User messages are immutable; appending to one is ignored.
    pub fn append(&mut self, id: MessageId, text: &str) {
        if let Some(msg) = self.messages.get_mut(id.0)
            && msg.role == Role::Bot
        {
            msg.text.push_str(text);
            msg.state = MessageState::Streaming;
        }
    }

    /// Update the lifecycle state of a bot message.
    ///
    /// A failed message drops whatever answer had accumulated.
    pub fn set_state(&mut self, id: MessageId, state: MessageState) {
        if let Some(msg) = self.messages.get_mut(id.0)
            && msg.role == Role::Bot
        {
            if state == MessageState::Failed {
                msg.text.clear();
            }
            msg.state = state;
        }
    }

    /// Look up a message.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(id.0)
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// All messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, role: Role, text: String, state: MessageState) -> MessageId {
        self.messages.push(Message {
            role,
            text,
            state,
            created_at: Utc::now(),
        });
        MessageId(self.messages.len() - 1)
    }
}
