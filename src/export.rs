use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};

/// Extensions accepted as markdown sources
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Where an HTML export goes when no output path is given. An input that
/// is already HTML gets a `.export.html` sibling instead of being replaced.
pub fn default_output_path(input: &Path) -> PathBuf {
    let is_html = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    if is_html {
        input.with_extension("export.html")
    } else {
        input.with_extension("html")
    }
}

/// Refuse to write output over the file it was rendered from.
pub fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
    let same = input == output
        || match (fs::canonicalize(input), fs::canonicalize(output)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
    if same {
        return Err(Error::SameFile {
            path: output.to_path_buf(),
        });
    }
    Ok(())
}

pub fn read_markdown(path: &Path) -> Result<String> {
    if !is_markdown_path(path) {
        log::warn!("{} does not look like a markdown file", path.display());
    }
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Render markdown as a complete HTML document and write it to `path`.
pub fn export_html(markdown: &str, path: &Path, config: &Config) -> Result<()> {
    let html = crate::to_html_document_with_config(markdown, config);
    write_output(path, &html)
}
