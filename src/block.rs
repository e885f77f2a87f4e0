use serde::Serialize;

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis { strong: bool, children: Vec<Inline> },
    Strikethrough(Vec<Inline>),
    Link { target: String, children: Vec<Inline> },
    /// Alt text is kept verbatim, never tokenized
    Image { alt: String, source: String },
}

/// A single list item. Nested sub-lists are flattened; `indent` keeps the
/// leading whitespace width of the source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    /// For task lists: None = not a task, Some(false) = unchecked, Some(true) = checked
    pub checked: Option<bool>,
    pub indent: usize,
    pub content: Vec<Inline>,
}

/// A list (ordered or unordered)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct List {
    pub ordered: bool,
    /// Number of the first item; always 1 for unordered lists
    pub start: u64,
    pub items: Vec<ListItem>,
}

/// Column alignment taken from a table separator row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// Block-level elements parsed from Markdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    CodeBlock {
        language: Option<String>,
        lines: Vec<String>,
    },
    BlockQuote {
        children: Vec<Block>,
    },
    List(List),
    Table {
        alignments: Vec<Alignment>,
        headers: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    ThematicBreak,
}

/// A fully parsed document. Rebuilt from scratch on every parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
