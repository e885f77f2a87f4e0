use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub html: HtmlConfig,
}

/// Settings for the exported HTML document
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HtmlConfig {
    /// Contents of the `<title>` element
    pub title: String,
    /// Embed the built-in stylesheet
    pub include_styles: bool,
    /// Extra CSS appended after the built-in stylesheet
    pub custom_css: Option<String>,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            title: "Markdown Export".to_string(),
            include_styles: true,
            custom_css: None,
        }
    }
}

impl Config {
    /// The config bundled into the binary. `build.rs` checks it parses.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, failing on a missing or invalid file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from a TOML file, or return defaults if not found or invalid.
    pub fn load(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(Error::ConfigRead { .. }) => Self::compiled_default(),
            Err(e) => {
                log::warn!("{e}, using defaults");
                Self::compiled_default()
            }
        }
    }
}
