use std::collections::HashMap;

use crate::block::Inline;

/// Nesting depth past which inline markup is kept as literal text
const MAX_NESTING: usize = 32;

/// Parses a single run of text into inline nodes.
///
/// Constructs are tried in precedence order at every position: code span,
/// image, link, strikethrough, emphasis. Anything that does not match is
/// kept as literal text, so malformed markup never loses content.
pub fn tokenize(text: &str) -> Vec<Inline> {
    tokenize_nested(text, 0)
}

fn tokenize_nested(text: &str, depth: usize) -> Vec<Inline> {
    let marks = Marks::index(text);
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    while pos < text.len() {
        let parsed = match bytes[pos] {
            b'`' => code_span(text, &marks, pos),
            b'!' => image(text, &marks, pos),
            _ if depth >= MAX_NESTING => None,
            b'[' => link(text, &marks, pos, depth),
            b'~' => strikethrough(text, pos, depth),
            b'*' | b'_' => emphasis(text, &marks, pos, depth),
            _ => None,
        };

        match parsed {
            Some((node, end)) => {
                flush_text(&mut out, &mut literal);
                out.push(node);
                pos = end;
            }
            None => {
                let end = literal_end(text, pos);
                literal.push_str(&text[pos..end]);
                pos = end;
            }
        }
    }

    flush_text(&mut out, &mut literal);
    out
}

/// Matching delimiters for one run of text, found up front so that every
/// lookup during tokenizing is constant time.
struct Marks {
    /// Opening backtick run -> start of the closing run
    code: HashMap<usize, usize>,
    /// `[` -> matching `]`
    brackets: HashMap<usize, usize>,
    /// `(` -> matching `)`
    parens: HashMap<usize, usize>,
    /// Emphasis opener -> start of its closing run
    emphasis: HashMap<usize, usize>,
}

impl Marks {
    fn index(text: &str) -> Self {
        let code = index_code_spans(text);
        let emphasis = index_emphasis(text, &code);
        Self {
            brackets: index_pairs(text, b'[', b']'),
            parens: index_pairs(text, b'(', b')'),
            code,
            emphasis,
        }
    }
}

/// Pairs each opener with the closer that brings nesting back to zero.
fn index_pairs(text: &str, open: u8, close: u8) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut stack = Vec::new();
    for (i, b) in text.bytes().enumerate() {
        if b == open {
            stack.push(i);
        } else if b == close {
            if let Some(start) = stack.pop() {
                pairs.insert(start, i);
            }
        }
    }
    pairs
}

/// Pairs each backtick run with the next run of the same length.
fn index_code_spans(text: &str) -> HashMap<usize, usize> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < text.len() {
        if text.as_bytes()[i] == b'`' {
            let len = run_length(text, i, b'`');
            runs.push((i, len));
            i += len;
        } else {
            i += 1;
        }
    }

    let mut spans = HashMap::new();
    let mut next_of_len: HashMap<usize, usize> = HashMap::new();
    for &(start, len) in runs.iter().rev() {
        if let Some(&close) = next_of_len.get(&len) {
            spans.insert(start, close);
        }
        next_of_len.insert(len, start);
    }
    spans
}

/// Finds the closer of every emphasis opener.
///
/// Openers are resolved right to left, so when the closer search for one
/// opener meets a nested opener of the same marker, that opener's match is
/// already known and the whole nested span is skipped. Search results are
/// shared between openers with the same marker and run length, which keeps
/// unmatched openers from rescanning the rest of the text.
fn index_emphasis(text: &str, code: &HashMap<usize, usize>) -> HashMap<usize, usize> {
    let bytes = text.as_bytes();
    let len = bytes.len();

    // Next position at or after i holding a delimiter byte
    let mut next_stop = vec![len; len + 1];
    for i in (0..len).rev() {
        next_stop[i] = if matches!(bytes[i], b'*' | b'_' | b'`') {
            i
        } else {
            next_stop[i + 1]
        };
    }

    let mut matches: HashMap<usize, usize> = HashMap::new();
    let mut searched: HashMap<(usize, usize, u8), Option<usize>> = HashMap::new();
    let mut visited = Vec::new();

    for pos in (0..len).rev() {
        let marker = bytes[pos];
        if !matches!(marker, b'*' | b'_') || !can_open(text, pos) {
            continue;
        }
        let open = run_length(text, pos, marker);

        let mut at = next_stop[pos + open];
        let found = loop {
            if at >= len {
                break None;
            }
            if let Some(&known) = searched.get(&(at, open, marker)) {
                break known;
            }
            visited.push(at);

            let b = bytes[at];
            let step_to = if b == b'`' {
                // Delimiters inside code spans never close emphasis
                match code.get(&at) {
                    Some(&close) => close + run_length(text, close, b'`'),
                    None => at + run_length(text, at, b'`'),
                }
            } else if b == marker {
                if can_close(text, at, open) {
                    break Some(at);
                }
                match matches.get(&at) {
                    Some(&close) => close + run_length(text, at, marker),
                    None => at + run_length(text, at, marker),
                }
            } else {
                at + run_length(text, at, b)
            };
            at = next_stop[step_to];
        };

        for stop in visited.drain(..) {
            searched.insert((stop, open, marker), found);
        }
        if let Some(close) = found {
            matches.insert(pos, close);
        }
    }

    matches
}

/// An opening run is followed by non-whitespace; `_` may not open inside a word.
fn can_open(text: &str, pos: usize) -> bool {
    let marker = text.as_bytes()[pos];
    let run_end = pos + run_length(text, pos, marker);
    if char_after(text, run_end).is_none_or(char::is_whitespace) {
        return false;
    }
    !(marker == b'_' && char_before(text, pos).is_some_and(char::is_alphanumeric))
}

/// A closing run is at least as long as the opener and not preceded by
/// whitespace. A run followed by a word character may not close inside a
/// word (`_`) or with leftover delimiters (`*foo**bar*`).
fn can_close(text: &str, at: usize, open: usize) -> bool {
    let marker = text.as_bytes()[at];
    let close = run_length(text, at, marker);
    if close < open || char_before(text, at).is_none_or(char::is_whitespace) {
        return false;
    }
    let followed_by_word = char_after(text, at + close).is_some_and(char::is_alphanumeric);
    !(followed_by_word && (marker == b'_' || close > open))
}

fn flush_text(out: &mut Vec<Inline>, literal: &mut String) {
    if !literal.is_empty() {
        out.push(Inline::Text(std::mem::take(literal)));
    }
}

/// End of the literal chunk starting at `pos`. Delimiter runs are consumed
/// whole so an unmatched `**` is not retried as `*`.
fn literal_end(text: &str, pos: usize) -> usize {
    match text.as_bytes()[pos] {
        marker @ (b'`' | b'*' | b'_' | b'~') => pos + run_length(text, pos, marker),
        _ => {
            let width = text[pos..].chars().next().map_or(1, char::len_utf8);
            pos + width
        }
    }
}

fn run_length(text: &str, pos: usize, marker: u8) -> usize {
    text.as_bytes()[pos..]
        .iter()
        .take_while(|&&b| b == marker)
        .count()
}

fn char_before(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

fn char_after(text: &str, pos: usize) -> Option<char> {
    text[pos..].chars().next()
}

/// `` `code` `` — closed by a backtick run of the same length.
fn code_span(text: &str, marks: &Marks, pos: usize) -> Option<(Inline, usize)> {
    let close = *marks.code.get(&pos)?;
    let open = run_length(text, pos, b'`');

    let mut content = &text[pos + open..close];
    // One padding space on each side lets a span start or end with a backtick
    if content.len() > 2
        && content.starts_with(' ')
        && content.ends_with(' ')
        && !content.trim().is_empty()
    {
        content = &content[1..content.len() - 1];
    }
    Some((Inline::Code(content.to_string()), close + open))
}

/// `![alt](source)` — alt text stays plain.
fn image(text: &str, marks: &Marks, pos: usize) -> Option<(Inline, usize)> {
    if !text[pos..].starts_with("![") {
        return None;
    }
    let close = *marks.brackets.get(&(pos + 1))?;
    let (source, end) = destination(text, marks, close + 1)?;
    let alt = text[pos + 2..close].to_string();
    Some((Inline::Image { alt, source }, end))
}

/// `[text](target)` — link text is tokenized recursively.
fn link(text: &str, marks: &Marks, pos: usize, depth: usize) -> Option<(Inline, usize)> {
    let close = *marks.brackets.get(&pos)?;
    let (target, end) = destination(text, marks, close + 1)?;
    let children = tokenize_nested(&text[pos + 1..close], depth + 1);
    Some((Inline::Link { target, children }, end))
}

/// Parses `(target)` at `at`, returning the trimmed target and the position
/// after the closing parenthesis.
fn destination(text: &str, marks: &Marks, at: usize) -> Option<(String, usize)> {
    if text.as_bytes().get(at) != Some(&b'(') {
        return None;
    }
    let close = *marks.parens.get(&at)?;
    Some((text[at + 1..close].trim().to_string(), close + 1))
}

/// `~~text~~`
fn strikethrough(text: &str, pos: usize, depth: usize) -> Option<(Inline, usize)> {
    if run_length(text, pos, b'~') != 2 {
        return None;
    }
    let content_start = pos + 2;
    // Content must be non-empty, so the search starts one byte in
    let first = char_after(text, content_start)?;
    let search_from = content_start + first.len_utf8();
    let close = search_from + text[search_from..].find("~~")?;
    let children = tokenize_nested(&text[content_start..close], depth + 1);
    Some((Inline::Strikethrough(children), close + 2))
}

/// `*em*`, `_em_`, `**strong**`, `__strong__`, and `***both***`.
///
/// The closing run is the nearest one of the same marker that can close,
/// skipping over nested spans of that marker. Only the first `open`
/// characters of a longer closing run belong to this span; the rest are
/// left for an enclosing span.
fn emphasis(text: &str, marks: &Marks, pos: usize, depth: usize) -> Option<(Inline, usize)> {
    let close = *marks.emphasis.get(&pos)?;
    let open = run_length(text, pos, text.as_bytes()[pos]);
    let children = tokenize_nested(&text[pos + open..close], depth + 1);

    let node = match open {
        1 => Inline::Emphasis {
            strong: false,
            children,
        },
        2 => Inline::Emphasis {
            strong: true,
            children,
        },
        _ => Inline::Emphasis {
            strong: true,
            children: vec![Inline::Emphasis {
                strong: false,
                children,
            }],
        },
    };
    Some((node, close + open))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn em(children: Vec<Inline>) -> Inline {
        Inline::Emphasis {
            strong: false,
            children,
        }
    }

    fn strong(children: Vec<Inline>) -> Inline {
        Inline::Emphasis {
            strong: true,
            children,
        }
    }

    #[test]
    fn plain_text_is_one_node() {
        assert_eq!(tokenize("just some words"), vec![text("just some words")]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokenize(""), vec![]);
    }

    #[rstest]
    #[case("*italic")]
    #[case("**bold")]
    #[case("~~gone")]
    #[case("`code")]
    #[case("[text](no-close")]
    #[case("![alt]")]
    #[case("* not emphasis *")]
    #[case("snake_case_name")]
    #[case("a ~ b")]
    fn malformed_markup_stays_literal(#[case] input: &str) {
        assert_eq!(tokenize(input), vec![text(input)]);
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(
            tokenize("**a** *b*"),
            vec![strong(vec![text("a")]), text(" "), em(vec![text("b")])]
        );
        assert_eq!(tokenize("__a__ _b_"), tokenize("**a** *b*"));
    }

    #[test]
    fn triple_marker_is_strong_and_italic() {
        assert_eq!(tokenize("***both***"), vec![strong(vec![em(vec![text("both")])])]);
    }

    #[test]
    fn nested_emphasis() {
        assert_eq!(
            tokenize("**bold *and italic* still bold**"),
            vec![strong(vec![
                text("bold "),
                em(vec![text("and italic")]),
                text(" still bold"),
            ])]
        );
    }

    #[test]
    fn longer_closing_run_closes_outer_span() {
        assert_eq!(
            tokenize("*a **b***"),
            vec![em(vec![text("a "), strong(vec![text("b")])])]
        );
    }

    #[rstest]
    #[case("*a **b** c*", vec![em(vec![text("a "), strong(vec![text("b")]), text(" c")])])]
    #[case("**a *b* c**", vec![strong(vec![text("a "), em(vec![text("b")]), text(" c")])])]
    #[case(
        "*see **this** now*",
        vec![em(vec![text("see "), strong(vec![text("this")]), text(" now")])]
    )]
    #[case("_a __b__ c_", vec![em(vec![text("a "), strong(vec![text("b")]), text(" c")])])]
    #[case(
        "~~a *b* c~~",
        vec![Inline::Strikethrough(vec![text("a "), em(vec![text("b")]), text(" c")])]
    )]
    fn same_marker_spans_nest(#[case] input: &str, #[case] expected: Vec<Inline>) {
        assert_eq!(tokenize(input), expected);
    }

    #[test]
    fn closer_with_leftover_markers_inside_a_word_is_skipped() {
        assert_eq!(tokenize("*foo**bar*"), vec![em(vec![text("foo**bar")])]);
    }

    #[test]
    fn unclosed_marker_resumes_after_it() {
        assert_eq!(
            tokenize("**open and *closed*"),
            vec![text("**open and "), em(vec![text("closed")])]
        );
    }

    #[test]
    fn code_span_is_literal() {
        assert_eq!(
            tokenize("use `**x**` here"),
            vec![text("use "), Inline::Code("**x**".to_string()), text(" here")]
        );
    }

    #[test]
    fn code_span_needs_matching_run_length() {
        assert_eq!(
            tokenize("``a ` b``"),
            vec![Inline::Code("a ` b".to_string())]
        );
        assert_eq!(tokenize("`` ` ``"), vec![Inline::Code("`".to_string())]);
    }

    #[test]
    fn emphasis_ignores_markers_in_code() {
        assert_eq!(
            tokenize("*a `*` b*"),
            vec![em(vec![text("a "), Inline::Code("*".to_string()), text(" b")])]
        );
    }

    #[test]
    fn link_text_is_tokenized() {
        assert_eq!(
            tokenize("see [the **docs**](https://example.com)"),
            vec![
                text("see "),
                Inline::Link {
                    target: "https://example.com".to_string(),
                    children: vec![text("the "), strong(vec![text("docs")])],
                },
            ]
        );
    }

    #[test]
    fn image_alt_is_plain() {
        assert_eq!(
            tokenize("![a *cat*](cat.png)"),
            vec![Inline::Image {
                alt: "a *cat*".to_string(),
                source: "cat.png".to_string(),
            }]
        );
    }

    #[test]
    fn bang_without_image_falls_through_to_link() {
        assert_eq!(
            tokenize("wow![x](y)"),
            vec![
                text("wow"),
                Inline::Image {
                    alt: "x".to_string(),
                    source: "y".to_string(),
                },
            ]
        );
        assert_eq!(
            tokenize("wow! [x](y)"),
            vec![
                text("wow! "),
                Inline::Link {
                    target: "y".to_string(),
                    children: vec![text("x")],
                },
            ]
        );
    }

    #[test]
    fn link_target_with_parentheses() {
        assert_eq!(
            tokenize("[wiki](https://en.wikipedia.org/wiki/Rust_(language))"),
            vec![Inline::Link {
                target: "https://en.wikipedia.org/wiki/Rust_(language)".to_string(),
                children: vec![text("wiki")],
            }]
        );
    }

    #[test]
    fn strikethrough_content_is_tokenized() {
        assert_eq!(
            tokenize("~~old **news**~~ new"),
            vec![
                Inline::Strikethrough(vec![text("old "), strong(vec![text("news")])]),
                text(" new"),
            ]
        );
    }

    #[test]
    fn intraword_underscore_is_literal_but_star_is_not() {
        assert_eq!(tokenize("a_b_c"), vec![text("a_b_c")]);
        assert_eq!(
            tokenize("a*b*c"),
            vec![text("a"), em(vec![text("b")]), text("c")]
        );
    }

    #[test]
    fn many_unmatched_markers_stay_fast() {
        let input = "*a ".repeat(50_000);
        let started = std::time::Instant::now();
        let nodes = tokenize(&input);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        assert_eq!(nodes, vec![text(&input)]);
    }

    #[test]
    fn deep_link_nesting_is_capped() {
        let input = format!("{}x{}", "[".repeat(10_000), "](y)".repeat(10_000));
        let nodes = tokenize(&input);

        let mut depth = 0;
        let mut level = &nodes;
        while let Some(Inline::Link { children, .. }) = level.first() {
            depth += 1;
            level = children;
        }
        assert_eq!(depth, MAX_NESTING);
    }

    #[test]
    fn multibyte_text_is_preserved() {
        assert_eq!(
            tokenize("héllo *wörld* ✓"),
            vec![text("héllo "), em(vec![text("wörld")]), text(" ✓")]
        );
    }
}
