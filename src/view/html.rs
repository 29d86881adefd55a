//! In-memory model of the hosting page.

use super::{ChatView, Content, InputHeight, NodeId};
use crate::markdown::escape_html;
use crate::transcript::Role;

const LINE_HEIGHT_PX: u32 = 24;
const INPUT_PADDING_PX: u32 = 20;
const DEFAULT_BOT_LOGO: &str = "KNOU";

/// One entry in the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNode {
    /// Author of the entry.
    pub role: Role,
    /// Inner HTML of the `.message-content` container.
    pub content_html: String,
}

/// Page model holding the chat box, text input and send control.
///
/// Every state change the controller makes is observable through accessors,
/// and [`HtmlView::chat_box_html`] serializes the message list the way the
/// page would show it.
#[derive(Debug)]
pub struct HtmlView {
    nodes: Vec<MessageNode>,
    input_value: String,
    input_disabled: bool,
    send_disabled: bool,
    input_focused: bool,
    input_height: InputHeight,
    scroll_top: u32,
    bot_logo: String,
}

impl Default for HtmlView {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlView {
    /// Create an empty page with enabled controls.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            input_value: String::new(),
            input_disabled: false,
            send_disabled: false,
            input_focused: false,
            input_height: InputHeight::Auto,
            scroll_top: 0,
            bot_logo: DEFAULT_BOT_LOGO.to_string(),
        }
    }

    /// Use a different glyph in the bot avatar.
    #[must_use]
    pub fn with_bot_logo(mut self, logo: impl Into<String>) -> Self {
        self.bot_logo = logo.into();
        self
    }

    /// Simulate typing: replace the text input's value.
    pub fn set_input_value(&mut self, value: impl Into<String>) {
        self.input_value = value.into();
    }

    /// All entries in the message list.
    #[must_use]
    pub fn nodes(&self) -> &[MessageNode] {
        &self.nodes
    }

    /// Look up one entry.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&MessageNode> {
        self.nodes.get(id.0)
    }

    /// Whether the text input is disabled.
    #[must_use]
    pub fn input_disabled(&self) -> bool {
        self.input_disabled
    }

    /// Whether the send control is disabled.
    #[must_use]
    pub fn send_disabled(&self) -> bool {
        self.send_disabled
    }

    /// Whether the text input holds keyboard focus.
    #[must_use]
    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    /// Current height of the text input.
    #[must_use]
    pub fn input_height(&self) -> InputHeight {
        self.input_height
    }

    /// Scroll offset of the message list.
    #[must_use]
    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    /// Total content height of the message list.
    #[must_use]
    pub fn scroll_height(&self) -> u32 {
        self.nodes
            .iter()
            .map(|n| line_count(&n.content_html).saturating_add(1).saturating_mul(LINE_HEIGHT_PX))
            .sum()
    }

    /// Whether the message list is scrolled all the way down.
    #[must_use]
    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll_top >= self.scroll_height()
    }

    /// Serialize one entry with its avatar.
    #[must_use]
    pub fn message_html(&self, id: NodeId) -> Option<String> {
        self.node(id).map(|n| self.render_node(n))
    }

    /// Serialize the whole message list.
    #[must_use]
    pub fn chat_box_html(&self) -> String {
        let mut out = String::from(r#"<div id="chat-box">"#);
        for node in &self.nodes {
            out.push_str(&self.render_node(node));
        }
        out.push_str("</div>");
        out
    }

    fn render_node(&self, node: &MessageNode) -> String {
        let (class, avatar) = match node.role {
            Role::User => (
                "user-message",
                r#"<div class="user-avatar">U</div>"#.to_string(),
            ),
            Role::Bot => (
                "bot-message",
                format!(
                    r#"<div class="bot-avatar"><div class="logo">{}</div></div>"#,
                    escape_html(&self.bot_logo)
                ),
            ),
        };
        format!(
            r#"<div class="message {class}">{avatar}<div class="message-content">{}</div></div>"#,
            node.content_html
        )
    }
}

impl ChatView for HtmlView {
    fn append_message(&mut self, role: Role, content: Content<'_>) -> NodeId {
        self.nodes.push(MessageNode {
            role,
            content_html: content_html(content),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn set_content(&mut self, node: NodeId, content: Content<'_>) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.content_html = content_html(content);
        }
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.scroll_height();
    }

    fn input_value(&self) -> String {
        self.input_value.clone()
    }

    fn clear_input(&mut self) {
        self.input_value.clear();
    }

    fn set_input_height(&mut self, height: InputHeight) {
        self.input_height = height;
    }

    fn input_scroll_height(&self) -> u32 {
        line_count(&self.input_value)
            .max(1)
            .saturating_mul(LINE_HEIGHT_PX)
            .saturating_add(INPUT_PADDING_PX)
    }

    fn set_controls_disabled(&mut self, disabled: bool) {
        self.input_disabled = disabled;
        self.send_disabled = disabled;
        if disabled {
            self.input_focused = false;
        }
    }

    fn focus_input(&mut self) {
        // A disabled element cannot take focus.
        if !self.input_disabled {
            self.input_focused = true;
        }
    }
}

/// Inner HTML for a content container.
fn content_html(content: Content<'_>) -> String {
    match content {
        Content::Text(text) => format!("<p>{}</p>", escape_html(text)),
        Content::Loading => r#"<span class="typing-cursor"></span>"#.to_string(),
        Content::Empty => String::new(),
        Content::Markdown { html, .. } => html.to_string(),
        Content::Error(notice) => {
            let mut out = String::from(r#"<p class="error">"#);
            for (i, line) in notice.lines().enumerate() {
                if i > 0 {
                    out.push_str("<br>");
                }
                out.push_str(&escape_html(line));
            }
            out.push_str("</p>");
            out
        }
    }
}

fn line_count(text: &str) -> u32 {
    u32::try_from(text.lines().count()).unwrap_or(u32::MAX)
}
