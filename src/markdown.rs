//! Markdown rendering for bot answers and escaping for user text.

use pulldown_cmark::{Options, Parser, html};

/// Render a markdown document to an HTML fragment.
///
/// The whole document is parsed on every call. Streamed answers are short,
/// and re-rendering the accumulated source is what keeps constructs that
/// span chunk boundaries (emphasis, code fences, tables) correct.
#[must_use]
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Escape text for insertion into HTML element content or attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(render_markdown("# Hi\nthere"), "<h1>Hi</h1>\n<p>there</p>\n");
    }

    #[test]
    fn test_emphasis_needs_full_source() {
        let whole = render_markdown("**bold**");
        let pieces = format!("{}{}", render_markdown("**bo"), render_markdown("ld**"));
        assert_eq!(whole, "<p><strong>bold</strong></p>\n");
        assert_ne!(whole, pieces);
    }

    #[test]
    fn test_gfm_table() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x')</script> & co"),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;&#x2F;script&gt; &amp; co"
        );
    }
}
