use crate::block::{Alignment, Block, Document, List, ListItem};
use crate::inline::tokenize;

/// Quote nesting past which `>` is kept as paragraph text
const MAX_QUOTE_DEPTH: usize = 32;

/// Parse markdown text into a document.
///
/// Lines are classified one at a time, first match wins: fence, code
/// content, heading, thematic break, table, list item, block quote, blank
/// line, paragraph text.
pub fn scan(markdown: &str) -> Document {
    scan_nested(markdown, 0)
}

fn scan_nested(markdown: &str, depth: usize) -> Document {
    let normalized = markdown.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.lines().collect();
    let mut state = ScanState {
        depth,
        ..ScanState::default()
    };

    let mut index = 0;
    while index < lines.len() {
        index += state.process_line(&lines, index);
    }

    state.finish()
}

#[derive(Default)]
struct ScanState {
    blocks: Vec<Block>,
    // Block currently accumulating lines
    open: Open,
    // Number of enclosing block quotes
    depth: usize,
}

#[derive(Default)]
enum Open {
    #[default]
    Nothing,
    Paragraph(Vec<String>),
    Code {
        fence: Fence,
        language: Option<String>,
        lines: Vec<String>,
    },
    Quote(Vec<String>),
    List {
        ordered: bool,
        start: u64,
        items: Vec<PendingItem>,
    },
}

#[derive(Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

/// List item whose text is tokenized when the list is flushed
struct PendingItem {
    checked: Option<bool>,
    indent: usize,
    text: String,
}

struct ItemMarker<'a> {
    ordered: bool,
    number: u64,
    checked: Option<bool>,
    indent: usize,
    text: &'a str,
}

impl ScanState {
    /// Handles the line at `index` and returns how many lines were consumed.
    fn process_line(&mut self, lines: &[&str], index: usize) -> usize {
        let line = lines[index];

        let closes_code = match &self.open {
            Open::Code { fence, .. } => Some(closes_fence(line, *fence)),
            _ => None,
        };
        match closes_code {
            Some(true) => {
                self.flush();
                return 1;
            }
            Some(false) => {
                if let Open::Code { lines: code, .. } = &mut self.open {
                    code.push(line.to_string());
                }
                return 1;
            }
            None => {}
        }

        if let Some((fence, language)) = opening_fence(line) {
            self.flush();
            self.open = Open::Code {
                fence,
                language,
                lines: Vec::new(),
            };
            return 1;
        }

        if let Some((level, text)) = heading(line) {
            self.flush();
            self.blocks.push(Block::Heading {
                level,
                content: tokenize(text),
            });
            return 1;
        }

        if is_thematic_break(line) {
            self.flush();
            self.blocks.push(Block::ThematicBreak);
            return 1;
        }

        if let Some(next) = lines.get(index + 1) {
            if line.contains('|') && is_table_separator(next) {
                self.flush();
                return self.table(lines, index);
            }
        }

        if let Some(item) = list_item(line) {
            self.push_item(item);
            return 1;
        }

        if let Some(body) = quote_line(line).filter(|_| self.depth < MAX_QUOTE_DEPTH) {
            if let Open::Quote(quoted) = &mut self.open {
                quoted.push(body.to_string());
                return 1;
            }
            self.flush();
            self.open = Open::Quote(vec![body.to_string()]);
            return 1;
        }

        if line.trim().is_empty() {
            self.flush();
            return 1;
        }

        self.push_text(line);
        1
    }

    fn push_text(&mut self, line: &str) {
        let text = line.trim();
        match &mut self.open {
            Open::Paragraph(buffer) => {
                buffer.push(text.to_string());
                return;
            }
            // Indented lines continue the previous list item
            Open::List { items, .. } if line.starts_with([' ', '\t']) => {
                if let Some(last) = items.last_mut() {
                    if !last.text.is_empty() {
                        last.text.push(' ');
                    }
                    last.text.push_str(text);
                }
                return;
            }
            _ => {}
        }
        self.flush();
        self.open = Open::Paragraph(vec![text.to_string()]);
    }

    fn push_item(&mut self, marker: ItemMarker<'_>) {
        let item = PendingItem {
            checked: marker.checked,
            indent: marker.indent,
            text: marker.text.to_string(),
        };

        if let Open::List { ordered, items, .. } = &mut self.open {
            if *ordered == marker.ordered {
                items.push(item);
                return;
            }
        }

        self.flush();
        self.open = Open::List {
            ordered: marker.ordered,
            start: marker.number,
            items: vec![item],
        };
    }

    /// Consumes the header, separator and every following row containing `|`.
    fn table(&mut self, lines: &[&str], index: usize) -> usize {
        let headers: Vec<_> = split_cells(lines[index]).into_iter().map(tokenize).collect();
        let width = headers.len();

        let mut alignments: Vec<Alignment> = split_cells(lines[index + 1])
            .into_iter()
            .map(cell_alignment)
            .collect();
        alignments.resize(width, Alignment::None);

        let mut rows = Vec::new();
        let mut consumed = 2;
        while let Some(line) = lines.get(index + consumed) {
            if !line.contains('|') {
                break;
            }
            let mut row: Vec<_> = split_cells(line).into_iter().map(tokenize).collect();
            row.resize(width, Vec::new());
            rows.push(row);
            consumed += 1;
        }

        self.blocks.push(Block::Table {
            alignments,
            headers,
            rows,
        });
        consumed
    }

    fn flush(&mut self) {
        match std::mem::take(&mut self.open) {
            Open::Nothing => {}
            Open::Paragraph(lines) => {
                self.blocks.push(Block::Paragraph {
                    content: tokenize(&lines.join(" ")),
                });
            }
            Open::Code {
                language, lines, ..
            } => {
                self.blocks.push(Block::CodeBlock { language, lines });
            }
            Open::Quote(body) => {
                let children = scan_nested(&body.join("\n"), self.depth + 1).blocks;
                self.blocks.push(Block::BlockQuote { children });
            }
            Open::List {
                ordered,
                start,
                items,
            } => {
                let items = items
                    .into_iter()
                    .map(|item| ListItem {
                        checked: item.checked,
                        indent: item.indent,
                        content: tokenize(&item.text),
                    })
                    .collect();
                self.blocks.push(Block::List(List {
                    ordered,
                    start,
                    items,
                }));
            }
        }
    }

    fn finish(mut self) -> Document {
        // An unterminated fence keeps everything after it as code
        self.flush();
        Document {
            blocks: self.blocks,
        }
    }
}

fn opening_fence(line: &str) -> Option<(Fence, Option<String>)> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    let language = (!info.is_empty()).then(|| info.to_string());
    Some((Fence { marker, len }, language))
}

fn closes_fence(line: &str, open: Fence) -> bool {
    match opening_fence(line) {
        Some((fence, None)) => fence.marker == open.marker && fence.len >= open.len,
        _ => false,
    }
}

/// `# Title` through `###### Title`; an optional closing `#` run is dropped.
fn heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.bytes().take_while(|b| *b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }

    let text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.is_empty() {
        without_closing
    } else if without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end()
    } else {
        text
    };
    Some((level as u8, text))
}

fn is_thematic_break(line: &str) -> bool {
    matches!(line.trim(), "---" | "***" | "___")
}

fn is_table_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('|')
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | ':' | '|' | ' ' | '\t'))
}

fn split_cells(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(str::trim).collect()
}

fn cell_alignment(cell: &str) -> Alignment {
    match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Alignment::Center,
        (true, false) => Alignment::Left,
        (false, true) => Alignment::Right,
        (false, false) => Alignment::None,
    }
}

fn list_item(line: &str) -> Option<ItemMarker<'_>> {
    let body = line.trim_start();
    let indent = indent_width(&line[..line.len() - body.len()]);
    let bytes = body.as_bytes();

    match bytes.first()? {
        b'-' | b'*' | b'+' => {
            let rest = body[1..].strip_prefix(' ')?;
            let (checked, text) = task_marker(rest);
            Some(ItemMarker {
                ordered: false,
                number: 1,
                checked,
                indent,
                text: text.trim(),
            })
        }
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            let rest = body[digits..].strip_prefix(". ")?;
            let number = body[..digits].parse().ok()?;
            Some(ItemMarker {
                ordered: true,
                number,
                checked: None,
                indent,
                text: rest.trim(),
            })
        }
        _ => None,
    }
}

fn task_marker(rest: &str) -> (Option<bool>, &str) {
    for (marker, checked) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
        if let Some(after) = rest.strip_prefix(marker) {
            if after.is_empty() || after.starts_with(' ') {
                return (Some(checked), after);
            }
        }
    }
    (None, rest)
}

fn indent_width(whitespace: &str) -> usize {
    whitespace
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn quote_line(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Inline;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn paragraph(s: &str) -> Block {
        Block::Paragraph {
            content: vec![text(s)],
        }
    }

    fn item(checked: Option<bool>, indent: usize, s: &str) -> ListItem {
        ListItem {
            checked,
            indent,
            content: vec![text(s)],
        }
    }

    #[rstest]
    #[case("# One", 1, "One")]
    #[case("### Three", 3, "Three")]
    #[case("###### Six", 6, "Six")]
    #[case("## Closed ##", 2, "Closed")]
    #[case("# C#", 1, "C#")]
    fn headings(#[case] input: &str, #[case] level: u8, #[case] title: &str) {
        assert_eq!(
            scan(input).blocks,
            vec![Block::Heading {
                level,
                content: vec![text(title)],
            }]
        );
    }

    #[rstest]
    #[case("#NoSpace")]
    #[case("####### Seven")]
    fn malformed_headings_are_paragraphs(#[case] input: &str) {
        assert_eq!(scan(input).blocks, vec![paragraph(input)]);
    }

    #[test]
    fn soft_breaks_join_with_a_space() {
        assert_eq!(
            scan("first line\n  second line\nthird").blocks,
            vec![paragraph("first line second line third")]
        );
    }

    #[test]
    fn blank_lines_separate_paragraphs() {
        assert_eq!(
            scan("one\n\n\ntwo\n").blocks,
            vec![paragraph("one"), paragraph("two")]
        );
    }

    #[test]
    fn fenced_code_is_verbatim() {
        assert_eq!(
            scan("```rust\nlet x = **1**;\n\n# not a heading\n```\nafter").blocks,
            vec![
                Block::CodeBlock {
                    language: Some("rust".to_string()),
                    lines: vec![
                        "let x = **1**;".to_string(),
                        String::new(),
                        "# not a heading".to_string(),
                    ],
                },
                paragraph("after"),
            ]
        );
    }

    #[test]
    fn tilde_fence_is_not_closed_by_backticks() {
        assert_eq!(
            scan("~~~\n```\n~~~").blocks,
            vec![Block::CodeBlock {
                language: None,
                lines: vec!["```".to_string()],
            }]
        );
    }

    #[test]
    fn unterminated_fence_takes_the_rest() {
        assert_eq!(
            scan("text\n```\ncode\n\n- not a list").blocks,
            vec![
                paragraph("text"),
                Block::CodeBlock {
                    language: None,
                    lines: vec![
                        "code".to_string(),
                        String::new(),
                        "- not a list".to_string(),
                    ],
                },
            ]
        );
    }

    #[rstest]
    #[case("---")]
    #[case("***")]
    #[case("___")]
    #[case("  ---  ")]
    fn thematic_breaks(#[case] input: &str) {
        assert_eq!(scan(input).blocks, vec![Block::ThematicBreak]);
    }

    #[test]
    fn thematic_break_closes_paragraph() {
        assert_eq!(
            scan("above\n---\nbelow").blocks,
            vec![paragraph("above"), Block::ThematicBreak, paragraph("below")]
        );
    }

    #[test]
    fn table_with_separator() {
        assert_eq!(
            scan("A | B\n---|---").blocks,
            vec![Block::Table {
                alignments: vec![Alignment::None, Alignment::None],
                headers: vec![vec![text("A")], vec![text("B")]],
                rows: vec![],
            }]
        );
    }

    #[test]
    fn table_rows_alignment_and_padding() {
        let md = "| L | C | R |\n|:--|:-:|--:|\n| 1 | 2 |\n| a | b | c | d |\nafter";
        assert_eq!(
            scan(md).blocks,
            vec![
                Block::Table {
                    alignments: vec![Alignment::Left, Alignment::Center, Alignment::Right],
                    headers: vec![vec![text("L")], vec![text("C")], vec![text("R")]],
                    rows: vec![
                        vec![vec![text("1")], vec![text("2")], vec![]],
                        vec![vec![text("a")], vec![text("b")], vec![text("c")]],
                    ],
                },
                paragraph("after"),
            ]
        );
    }

    #[test]
    fn pipe_line_without_separator_is_paragraph() {
        assert_eq!(
            scan("A | B\nC | D").blocks,
            vec![paragraph("A | B C | D")]
        );
    }

    #[test]
    fn unordered_and_ordered_lists_split() {
        assert_eq!(
            scan("- one\n* two\n1. three\n2. four").blocks,
            vec![
                Block::List(List {
                    ordered: false,
                    start: 1,
                    items: vec![item(None, 0, "one"), item(None, 0, "two")],
                }),
                Block::List(List {
                    ordered: true,
                    start: 1,
                    items: vec![item(None, 0, "three"), item(None, 0, "four")],
                }),
            ]
        );
    }

    #[test]
    fn ordered_list_keeps_start_number() {
        let doc = scan("3. c\n4. d");
        match &doc.blocks[..] {
            [Block::List(list)] => {
                assert!(list.ordered);
                assert_eq!(list.start, 3);
                assert_eq!(list.items.len(), 2);
            }
            other => panic!("expected one list, got {other:?}"),
        }
    }

    #[test]
    fn task_items_and_indent() {
        assert_eq!(
            scan("- [ ] todo\n- [x] done\n  - nested\n\t- tabbed").blocks,
            vec![Block::List(List {
                ordered: false,
                start: 1,
                items: vec![
                    item(Some(false), 0, "todo"),
                    item(Some(true), 0, "done"),
                    item(None, 2, "nested"),
                    item(None, 4, "tabbed"),
                ],
            })]
        );
    }

    #[test]
    fn ordered_items_never_become_tasks() {
        assert_eq!(
            scan("1. [x] literal").blocks,
            vec![Block::List(List {
                ordered: true,
                start: 1,
                items: vec![item(None, 0, "[x] literal")],
            })]
        );
    }

    #[test]
    fn indented_line_continues_list_item() {
        assert_eq!(
            scan("- first\n  continued\nplain").blocks,
            vec![
                Block::List(List {
                    ordered: false,
                    start: 1,
                    items: vec![item(None, 0, "first continued")],
                }),
                paragraph("plain"),
            ]
        );
    }

    #[test]
    fn list_marker_needs_space() {
        assert_eq!(scan("-dash\n1.5 ratio").blocks, vec![paragraph("-dash 1.5 ratio")]);
    }

    #[test]
    fn block_quote_is_scanned_recursively() {
        assert_eq!(
            scan("> # Quoted\n> line one\n> line two\n>\n> - item\n\nafter").blocks,
            vec![
                Block::BlockQuote {
                    children: vec![
                        Block::Heading {
                            level: 1,
                            content: vec![text("Quoted")],
                        },
                        paragraph("line one line two"),
                        Block::List(List {
                            ordered: false,
                            start: 1,
                            items: vec![item(None, 0, "item")],
                        }),
                    ],
                },
                paragraph("after"),
            ]
        );
    }

    #[test]
    fn nested_block_quotes() {
        assert_eq!(
            scan("> > deep").blocks,
            vec![Block::BlockQuote {
                children: vec![Block::BlockQuote {
                    children: vec![paragraph("deep")],
                }],
            }]
        );
    }

    #[test]
    fn quote_nesting_is_capped() {
        let doc = scan(&format!("{} x", ">".repeat(20_000)));

        let mut depth = 0;
        let mut blocks = &doc.blocks;
        while let [Block::BlockQuote { children }] = &blocks[..] {
            depth += 1;
            blocks = children;
        }
        assert_eq!(depth, MAX_QUOTE_DEPTH);
        assert_eq!(
            blocks,
            &vec![paragraph(&format!("{} x", ">".repeat(20_000 - MAX_QUOTE_DEPTH)))]
        );
    }

    #[test]
    fn different_construct_closes_quote() {
        assert_eq!(
            scan("> quoted\nplain").blocks,
            vec![
                Block::BlockQuote {
                    children: vec![paragraph("quoted")],
                },
                paragraph("plain"),
            ]
        );
    }

    #[test]
    fn crlf_input() {
        assert_eq!(
            scan("# T\r\n\r\nbody\rmore").blocks,
            vec![
                Block::Heading {
                    level: 1,
                    content: vec![text("T")],
                },
                paragraph("body more"),
            ]
        );
    }

    #[test]
    fn empty_and_blank_input() {
        assert!(scan("").is_empty());
        assert!(scan("  \n\n\t\n").is_empty());
    }
}
