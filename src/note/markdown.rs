//! Markdown → HTML rendering

use anyhow::Result;
use pulldown_cmark::{Options, Parser};
use tracing::trace;

/// Turns note markdown into an HTML fragment
///
/// `source_path` is the vault path of the note being rendered; relative
/// links in the output are resolved against it later by the inliner.
pub trait MarkdownRenderer {
    fn render(&self, markdown: &str, source_path: &str) -> Result<String>;
}

/// CommonMark renderer with the GitHub-style extensions notes commonly use
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMarkRenderer;

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str, source_path: &str) -> Result<String> {
        let mut opts = Options::empty();
        opts.insert(Options::ENABLE_TABLES);
        opts.insert(Options::ENABLE_STRIKETHROUGH);
        opts.insert(Options::ENABLE_TASKLISTS);

        let parser = Parser::new_ext(markdown, opts);
        let mut html = String::with_capacity(markdown.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html, parser);
        trace!(source = %source_path, bytes = html.len(), "Rendered markdown");
        Ok(html)
    }
}
