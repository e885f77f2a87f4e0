mod block;
mod config;
pub mod error;
pub mod export;
mod html;
mod inline;
mod parser;
mod preview;
mod stats;

pub use block::{Alignment, Block, Document, Inline, List, ListItem};
pub use config::{Config, HtmlConfig};
pub use error::{Error, Result};
pub use preview::{Segment, StyledText};
pub use stats::DocumentStats;

/// Parse a single run of inline markdown.
pub fn tokenize(text: &str) -> Vec<Inline> {
    inline::tokenize(text)
}

/// Parse markdown text into a document.
pub fn parse(markdown: &str) -> Document {
    let doc = parser::scan(markdown);
    log::debug!("Parsed {} top-level blocks", doc.blocks.len());
    doc
}

/// Flatten a parsed document into preview segments.
pub fn render_segments(doc: &Document) -> Vec<Segment> {
    preview::emit(doc)
}

/// Render a parsed document as a complete HTML page.
pub fn render_html(doc: &Document, config: &HtmlConfig) -> String {
    html::emit_html(doc, config)
}

/// Render a parsed document as an HTML body fragment.
pub fn render_html_fragment(doc: &Document) -> String {
    html::blocks_to_html(&doc.blocks)
}

/// Convert markdown to preview segments.
pub fn to_render_segments(markdown: &str) -> Vec<Segment> {
    render_segments(&parse(markdown))
}

/// Convert markdown to an HTML body fragment.
pub fn to_html_fragment(markdown: &str) -> String {
    render_html_fragment(&parse(markdown))
}

/// Convert markdown to a standalone HTML document using default config.
pub fn to_html_document(markdown: &str) -> String {
    to_html_document_with_config(markdown, &Config::compiled_default())
}

/// Convert markdown to a standalone HTML document with custom config.
pub fn to_html_document_with_config(markdown: &str, config: &Config) -> String {
    render_html(&parse(markdown), &config.html)
}
