use serde::Serialize;

use crate::block::{Block, Document, Inline, List};

const QUOTE_MARKER: &str = "│ ";
const CELL_SEPARATOR: &str = " | ";

/// Styled text with formatting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyledText {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
    pub strikethrough: bool,
    pub muted: bool,
    /// Heading level when the run belongs to a heading, used for sizing
    pub heading: Option<u8>,
    pub link: Option<String>,
}

impl StyledText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn with_monospace(mut self) -> Self {
        self.monospace = true;
        self
    }

    pub fn with_strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    pub fn with_muted(mut self) -> Self {
        self.muted = true;
        self
    }

    pub fn with_heading(mut self, level: u8) -> Self {
        self.heading = Some(level);
        self
    }

    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }

    /// Whether any formatting is applied
    pub fn is_plain(&self) -> bool {
        !self.bold
            && !self.italic
            && !self.monospace
            && !self.strikethrough
            && !self.muted
            && self.heading.is_none()
            && self.link.is_none()
    }

    /// Copy of this style carrying different text
    fn restyle(&self, text: &str) -> Segment {
        Segment::Text(Self {
            text: text.to_string(),
            ..self.clone()
        })
    }
}

/// One element of the preview output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Text(StyledText),
    Separator,
    LineBreak,
}

/// Flatten a document into preview segments for a live preview pane. A
/// front end only has to draw them in order. Every block ends with exactly
/// one `LineBreak`.
pub fn emit(doc: &Document) -> Vec<Segment> {
    let mut out = Vec::new();
    emit_blocks(&doc.blocks, &StyledText::default(), &mut out);
    out
}

fn emit_blocks(blocks: &[Block], base: &StyledText, out: &mut Vec<Segment>) {
    for block in blocks {
        emit_block(block, base, out);
    }
}

fn emit_block(block: &Block, base: &StyledText, out: &mut Vec<Segment>) {
    match block {
        Block::Heading { level, content } => {
            let style = base.clone().with_bold().with_heading(*level);
            inlines_to_segments(content, &style, out);
            if *level <= 2 {
                out.push(Segment::Separator);
            }
        }
        Block::Paragraph { content } => {
            inlines_to_segments(content, base, out);
        }
        Block::CodeBlock { lines, .. } => {
            let style = base.clone().with_monospace();
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    out.push(Segment::LineBreak);
                }
                out.push(style.restyle(line));
            }
        }
        Block::BlockQuote { children } => {
            let quoted = base.clone().with_muted();
            out.push(quoted.restyle(QUOTE_MARKER));
            emit_blocks(children, &quoted, out);
            // The last child already ended the quote's line
            if !children.is_empty() {
                return;
            }
        }
        Block::List(list) => {
            list_to_segments(list, base, out);
        }
        Block::Table { headers, rows, .. } => {
            let header_style = base.clone().with_bold();
            row_to_segments(headers, &header_style, base, out);
            out.push(Segment::Separator);
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    out.push(Segment::LineBreak);
                }
                row_to_segments(row, base, base, out);
            }
        }
        Block::ThematicBreak => {
            out.push(Segment::Separator);
        }
    }

    out.push(Segment::LineBreak);
}

fn list_to_segments(list: &List, base: &StyledText, out: &mut Vec<Segment>) {
    for (i, item) in list.items.iter().enumerate() {
        if i > 0 {
            out.push(Segment::LineBreak);
        }
        let marker = match item.checked {
            Some(true) => "☑ ".to_string(),
            Some(false) => "☐ ".to_string(),
            None if list.ordered => format!("{}. ", list.start + i as u64),
            None => "• ".to_string(),
        };
        let prefix = format!("{}{}", " ".repeat(item.indent), marker);
        out.push(base.restyle(&prefix));
        inlines_to_segments(&item.content, base, out);
    }
}

fn row_to_segments(
    cells: &[Vec<Inline>],
    style: &StyledText,
    base: &StyledText,
    out: &mut Vec<Segment>,
) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(base.restyle(CELL_SEPARATOR));
        }
        inlines_to_segments(cell, style, out);
    }
}

fn inlines_to_segments(nodes: &[Inline], style: &StyledText, out: &mut Vec<Segment>) {
    for node in nodes {
        match node {
            Inline::Text(text) => out.push(style.restyle(text)),
            Inline::Code(code) => out.push(style.clone().with_monospace().restyle(code)),
            Inline::Emphasis { strong, children } => {
                let nested = if *strong {
                    style.clone().with_bold()
                } else {
                    style.clone().with_italic()
                };
                inlines_to_segments(children, &nested, out);
            }
            Inline::Strikethrough(children) => {
                inlines_to_segments(children, &style.clone().with_strikethrough(), out);
            }
            Inline::Link { target, children } => {
                inlines_to_segments(children, &style.clone().with_link(target.as_str()), out);
            }
            Inline::Image { alt, source } => {
                let image = style.clone().with_italic().with_link(source.as_str());
                out.push(image.restyle(alt));
            }
        }
    }
}
