//! Markdown rendering adapter.
//!
//! The sync controller only sees the [`MarkdownRenderer`] trait. The default
//! implementation is [`CommonMarkRenderer`], backed by `pulldown-cmark`.

use pulldown_cmark::{html, Options, Parser};

use crate::error::SyncError;

/// Converts Markdown to HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, SyncError>;
}

/// CommonMark with tables, footnotes, strikethrough and task lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl CommonMarkRenderer {
    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> Result<String, SyncError> {
        let parser = Parser::new_ext(markdown, Self::options());
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_paragraphs() {
        let html = CommonMarkRenderer
            .render("# Guide\n\n## Setup\n\nRun it.")
            .unwrap();
        assert!(html.contains("<h1>Guide</h1>"));
        assert!(html.contains("<h2>Setup</h2>"));
        assert!(html.contains("<p>Run it.</p>"));
    }

    #[test]
    fn test_tables_enabled() {
        let html = CommonMarkRenderer
            .render("| a | b |\n|---|---|\n| 1 | 2 |\n")
            .unwrap();
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(CommonMarkRenderer.render("").unwrap(), "");
    }
}
