//! The display surface the chat controller drives.
//!
//! A hosting page provides four elements: the chat form, a text input, the
//! message list, and a send control. [`ChatView`] is that surface as a trait,
//! so the controller receives its handles by injection instead of reaching
//! for globals.
//!
//! # Implementations
//!
//! - [`HtmlView`]: in-memory page model producing the transcript HTML
//! - [`TerminalView`]: line-oriented output for the CLI

mod html;
mod terminal;

pub use html::{HtmlView, MessageNode};
pub use terminal::TerminalView;

use crate::transcript::Role;

/// Handle to a message entry created by [`ChatView::append_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// What a message's content container should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content<'a> {
    /// Plain user text. Views must never interpret it as markup.
    Text(&'a str),
    /// Typing cursor shown until the response opens.
    Loading,
    /// Nothing.
    Empty,
    /// Bot answer: the accumulated markdown and its rendered HTML.
    Markdown {
        /// Markdown source accumulated so far.
        source: &'a str,
        /// `source` rendered to HTML.
        html: &'a str,
    },
    /// Fixed error notice; lines are separated by `\n`.
    Error(&'a str),
}

/// Height of the text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputHeight {
    /// Let the control size itself.
    #[default]
    Auto,
    /// Explicit height in pixels.
    Pixels(u32),
}

/// Keys the input reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Return / Enter.
    Enter,
    /// A printable character.
    Char(char),
    /// Anything else.
    Other,
}

/// A keydown event on the text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    /// The key pressed.
    pub key: Key,
    /// Whether Shift was held.
    pub shift: bool,
}

impl KeyPress {
    /// Key without modifiers.
    #[must_use]
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    /// Key with Shift held.
    #[must_use]
    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

/// Display surface for one chat transcript and its input controls.
pub trait ChatView {
    /// Create a transcript entry (avatar plus content container) for `role`,
    /// append it to the message list, and return its handle.
    fn append_message(&mut self, role: Role, content: Content<'_>) -> NodeId;

    /// Replace the content of an entry wholesale.
    fn set_content(&mut self, node: NodeId, content: Content<'_>);

    /// Scroll the message list to its bottom.
    fn scroll_to_bottom(&mut self);

    /// Current value of the text input.
    fn input_value(&self) -> String;

    /// Clear the text input.
    fn clear_input(&mut self);

    /// Set the visual height of the text input.
    fn set_input_height(&mut self, height: InputHeight);

    /// Height the input's content needs, in pixels.
    fn input_scroll_height(&self) -> u32;

    /// Disable or enable both the text input and the send control.
    fn set_controls_disabled(&mut self, disabled: bool);

    /// Give keyboard focus to the text input.
    fn focus_input(&mut self);
}
