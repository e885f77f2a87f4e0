use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::block::{Alignment, Block, Document, Inline, List};
use crate::config::HtmlConfig;

const STYLESHEET: &str = r#"        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
            font-size: 16px;
            line-height: 1.6;
            color: #333;
            background-color: #fff;
            padding: 20px;
            max-width: 800px;
            margin: 0 auto;
        }
        h1, h2, h3, h4, h5, h6 {
            margin-top: 24px;
            margin-bottom: 16px;
            font-weight: 600;
            line-height: 1.25;
        }
        h1 { font-size: 2em; border-bottom: 1px solid #eee; padding-bottom: 0.3em; }
        h2 { font-size: 1.5em; border-bottom: 1px solid #eee; padding-bottom: 0.3em; }
        h3 { font-size: 1.25em; }
        h4 { font-size: 1em; }
        h5 { font-size: 0.875em; }
        h6 { font-size: 0.85em; color: #777; }
        p { margin-top: 0; margin-bottom: 16px; }
        a { color: #0969da; text-decoration: none; }
        a:hover { text-decoration: underline; }
        code {
            padding: 0.2em 0.4em;
            font-size: 85%;
            background-color: rgba(27,31,35,0.05);
            border-radius: 3px;
            font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace;
        }
        pre {
            padding: 16px;
            overflow: auto;
            font-size: 85%;
            line-height: 1.45;
            background-color: #f6f8fa;
            border-radius: 3px;
        }
        pre code {
            display: inline;
            padding: 0;
            background-color: transparent;
        }
        blockquote {
            padding: 0 1em;
            color: #6a737d;
            border-left: 0.25em solid #dfe2e5;
            margin: 0 0 16px 0;
        }
        ul, ol { padding-left: 2em; margin-top: 0; margin-bottom: 16px; }
        li { margin-bottom: 0.25em; }
        table { border-spacing: 0; border-collapse: collapse; margin-bottom: 16px; }
        table th, table td { padding: 6px 13px; border: 1px solid #dfe2e5; }
        table th { font-weight: 600; background-color: #f6f8fa; }
        table tr { background-color: #fff; border-top: 1px solid #c6cbd1; }
        table tr:nth-child(2n) { background-color: #f6f8fa; }
        hr { height: 0.25em; padding: 0; margin: 24px 0; background-color: #e1e4e8; border: 0; }
        img { max-width: 100%; box-sizing: content-box; }
        .task-list-item { list-style-type: none; }
        .task-list-item input { margin: 0 0.2em 0.25em -1.6em; vertical-align: middle; }
"#;

/// Render a document as a complete, self-contained HTML page
pub fn emit_html(doc: &Document, config: &HtmlConfig) -> String {
    wrap_document(&blocks_to_html(&doc.blocks), config)
}

/// Render blocks as an HTML body fragment
pub fn blocks_to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        emit_block(block, &mut out);
    }
    out
}

fn wrap_document(body: &str, config: &HtmlConfig) -> String {
    let mut style = String::new();
    if config.include_styles {
        style.push_str(STYLESHEET);
    }
    if let Some(css) = &config.custom_css {
        style.push_str(css);
        if !css.ends_with('\n') {
            style.push('\n');
        }
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>{}</title>\n    <style>\n{}    </style>\n</head>\n<body>\n{}</body>\n</html>\n",
        encode_text(&config.title),
        style,
        body
    )
}

fn emit_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading { level, content } => {
            out.push_str(&format!("<h{level}>"));
            inlines_to_html(content, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        Block::Paragraph { content } => {
            out.push_str("<p>");
            inlines_to_html(content, out);
            out.push_str("</p>\n");
        }
        Block::CodeBlock { language, lines } => {
            out.push_str("<pre><code");
            if let Some(lang) = language {
                out.push_str(" class=\"language-");
                out.push_str(&encode_double_quoted_attribute(lang));
                out.push('"');
            }
            out.push('>');
            for line in lines {
                out.push_str(&encode_text(line));
                out.push('\n');
            }
            out.push_str("</code></pre>\n");
        }
        Block::BlockQuote { children } => {
            out.push_str("<blockquote>\n");
            for child in children {
                emit_block(child, out);
            }
            out.push_str("</blockquote>\n");
        }
        Block::List(list) => {
            list_to_html(list, out);
        }
        Block::Table {
            alignments,
            headers,
            rows,
        } => {
            table_to_html(alignments, headers, rows, out);
        }
        Block::ThematicBreak => {
            out.push_str("<hr>\n");
        }
    }
}

fn list_to_html(list: &List, out: &mut String) {
    if list.ordered {
        if list.start == 1 {
            out.push_str("<ol>\n");
        } else {
            out.push_str(&format!("<ol start=\"{}\">\n", list.start));
        }
    } else {
        out.push_str("<ul>\n");
    }

    for item in &list.items {
        match item.checked {
            Some(checked) => {
                out.push_str("<li class=\"task-list-item\"><input type=\"checkbox\" disabled");
                if checked {
                    out.push_str(" checked");
                }
                out.push_str("> ");
            }
            None => out.push_str("<li>"),
        }
        inlines_to_html(&item.content, out);
        out.push_str("</li>\n");
    }

    out.push_str(if list.ordered { "</ol>\n" } else { "</ul>\n" });
}

fn table_to_html(
    alignments: &[Alignment],
    headers: &[Vec<Inline>],
    rows: &[Vec<Vec<Inline>>],
    out: &mut String,
) {
    out.push_str("<table>\n<thead>\n");
    row_to_html("th", alignments, headers, out);
    out.push_str("</thead>\n");

    if !rows.is_empty() {
        out.push_str("<tbody>\n");
        for row in rows {
            row_to_html("td", alignments, row, out);
        }
        out.push_str("</tbody>\n");
    }

    out.push_str("</table>\n");
}

fn row_to_html(tag: &str, alignments: &[Alignment], cells: &[Vec<Inline>], out: &mut String) {
    out.push_str("<tr>\n");
    for (i, cell) in cells.iter().enumerate() {
        let align = match alignments.get(i).copied().unwrap_or_default() {
            Alignment::None => "",
            Alignment::Left => " style=\"text-align: left\"",
            Alignment::Center => " style=\"text-align: center\"",
            Alignment::Right => " style=\"text-align: right\"",
        };
        out.push_str(&format!("<{tag}{align}>"));
        inlines_to_html(cell, out);
        out.push_str(&format!("</{tag}>\n"));
    }
    out.push_str("</tr>\n");
}

fn inlines_to_html(nodes: &[Inline], out: &mut String) {
    for node in nodes {
        inline_to_html(node, out);
    }
}

fn inline_to_html(node: &Inline, out: &mut String) {
    match node {
        Inline::Text(text) => {
            out.push_str(&encode_text(text));
        }
        Inline::Code(code) => {
            out.push_str("<code>");
            out.push_str(&encode_text(code));
            out.push_str("</code>");
        }
        Inline::Emphasis { strong, children } => {
            let tag = if *strong { "strong" } else { "em" };
            out.push_str(&format!("<{tag}>"));
            inlines_to_html(children, out);
            out.push_str(&format!("</{tag}>"));
        }
        Inline::Strikethrough(children) => {
            out.push_str("<del>");
            inlines_to_html(children, out);
            out.push_str("</del>");
        }
        Inline::Link { target, children } => {
            // Targets are emitted as written; no scheme filtering
            out.push_str("<a href=\"");
            out.push_str(&encode_double_quoted_attribute(target));
            out.push_str("\">");
            inlines_to_html(children, out);
            out.push_str("</a>");
        }
        Inline::Image { alt, source } => {
            out.push_str("<img src=\"");
            out.push_str(&encode_double_quoted_attribute(source));
            out.push_str("\" alt=\"");
            out.push_str(&encode_double_quoted_attribute(alt));
            out.push_str("\">");
        }
    }
}
