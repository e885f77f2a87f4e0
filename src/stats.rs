use std::fmt;

/// Line, word and character counts shown in an editor status bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub lines: usize,
    pub words: usize,
    pub characters: usize,
}

impl DocumentStats {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.matches('\n').count() + 1,
            words: text.split_whitespace().count(),
            characters: text.chars().count(),
        }
    }

    /// True when there is nothing to preview
    pub fn is_blank(&self) -> bool {
        self.words == 0
    }
}

impl fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lines: {} | Words: {} | Characters: {}",
            self.lines, self.words, self.characters
        )
    }
}
