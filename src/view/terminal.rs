//! Line-oriented view for terminals.
//!
//! A terminal cannot rewrite earlier output, so the bot entry streams only
//! the part of the markdown source that was not printed yet. Answers only
//! ever grow, which makes the suffix well defined.

use std::io::Write;

use super::{ChatView, Content, InputHeight, NodeId};
use crate::transcript::Role;

const PROMPT: &str = "> ";

/// [`ChatView`] writing the transcript to any [`Write`] sink.
#[derive(Debug)]
pub struct TerminalView<W: Write> {
    out: W,
    input: String,
    bot_label: String,
    prompt: Option<&'static str>,
    next_node: usize,
    /// Entry currently receiving streamed text.
    active: Option<NodeId>,
    /// Bytes of the active entry's source already written.
    printed: usize,
    line_open: bool,
}

impl<W: Write> TerminalView<W> {
    /// Create a view over `out`, labelling bot entries with `bot_label`.
    pub fn new(out: W, bot_label: impl Into<String>) -> Self {
        Self {
            out,
            input: String::new(),
            bot_label: bot_label.into(),
            prompt: Some(PROMPT),
            next_node: 0,
            active: None,
            printed: 0,
            line_open: false,
        }
    }

    /// Do not print an input prompt when focus returns.
    #[must_use]
    pub fn without_prompt(mut self) -> Self {
        self.prompt = None;
        self
    }

    /// Set the pending input line, as typed by the user.
    pub fn set_input(&mut self, line: impl Into<String>) {
        self.input = line.into();
    }

    /// Consume the view and return the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }

    fn end_line(&mut self) {
        if self.line_open {
            self.emit("\n");
            self.line_open = false;
        }
    }

    fn write_content(&mut self, node: NodeId, content: Content<'_>) {
        match content {
            Content::Loading | Content::Empty => {}
            Content::Text(text) => {
                self.emit(text);
                self.line_open = true;
            }
            Content::Markdown { source, .. } => {
                if self.active != Some(node) {
                    self.active = Some(node);
                    self.printed = 0;
                }
                let unseen = source.get(self.printed..).unwrap_or(source);
                if !unseen.is_empty() {
                    self.emit(unseen);
                    self.line_open = !unseen.ends_with('\n');
                }
                self.printed = source.len();
            }
            Content::Error(notice) => {
                self.end_line();
                for line in notice.lines() {
                    self.emit(&format!("! {line}\n"));
                }
            }
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn append_message(&mut self, role: Role, content: Content<'_>) -> NodeId {
        self.end_line();
        let node = NodeId(self.next_node);
        self.next_node += 1;

        let label = match role {
            Role::User => "U".to_string(),
            Role::Bot => self.bot_label.clone(),
        };
        self.emit(&format!("[{label}] "));
        self.line_open = true;
        self.write_content(node, content);
        if role == Role::User {
            self.end_line();
        }
        node
    }

    fn set_content(&mut self, node: NodeId, content: Content<'_>) {
        self.write_content(node, content);
    }

    fn scroll_to_bottom(&mut self) {}

    fn input_value(&self) -> String {
        self.input.clone()
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn set_input_height(&mut self, _height: InputHeight) {}

    fn input_scroll_height(&self) -> u32 {
        0
    }

    fn set_controls_disabled(&mut self, disabled: bool) {
        if !disabled {
            self.end_line();
            self.active = None;
            self.printed = 0;
        }
    }

    fn focus_input(&mut self) {
        self.end_line();
        if let Some(prompt) = self.prompt {
            self.emit(prompt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn test_streams_only_new_suffix() {
        let mut view = TerminalView::new(Vec::new(), "KNOU");
        view.append_message(Role::User, Content::Text("hi"));
        let bot = view.append_message(Role::Bot, Content::Loading);
        view.set_content(bot, Content::Empty);
        view.set_content(bot, Content::Markdown { source: "# He", html: "" });
        view.set_content(bot, Content::Markdown { source: "# Hello", html: "" });
        view.set_controls_disabled(false);

        assert_eq!(output(view), "[U] hi\n[KNOU] # Hello\n");
    }

    #[test]
    fn test_error_notice_on_own_lines() {
        let mut view = TerminalView::new(Vec::new(), "BOT");
        let bot = view.append_message(Role::Bot, Content::Loading);
        view.set_content(bot, Content::Error("Sorry.\nTry again."));
        view.focus_input();

        assert_eq!(output(view), "[BOT] \n! Sorry.\n! Try again.\n> ");
    }

    #[test]
    fn test_without_prompt() {
        let mut view = TerminalView::new(Vec::new(), "BOT").without_prompt();
        let bot = view.append_message(Role::Bot, Content::Loading);
        view.set_content(bot, Content::Markdown { source: "done", html: "" });
        view.set_controls_disabled(false);
        view.focus_input();

        assert_eq!(output(view), "[BOT] done\n");
    }

    #[test]
    fn test_input_round_trip() {
        let mut view = TerminalView::new(Vec::new(), "BOT");
        view.set_input("  question ");
        assert_eq!(view.input_value(), "  question ");
        view.clear_input();
        assert_eq!(view.input_value(), "");
    }
}
