// src/config/sources.rs
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ingest::types::{SourceDescriptor, SourceKind};

/// The source-descriptor document. JSON by default, TOML when the file ends in `.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub json_urls: Vec<String>,
    #[serde(default)]
    pub plain_text_urls: Vec<String>,
    #[serde(default)]
    pub telegram_channels: Vec<String>,
}

impl SourcesFile {
    /// Descriptors in priority order: JSON endpoints, plain-text lists
    /// (file entries, then `extra_plain`), then channel pages.
    pub fn descriptors(&self, extra_plain: &[String]) -> Vec<SourceDescriptor> {
        let json = clean(&self.json_urls).map(|u| SourceDescriptor::new(u, SourceKind::JsonArray));
        let plain = clean(&self.plain_text_urls)
            .chain(clean(extra_plain))
            .map(|u| SourceDescriptor::new(u, SourceKind::PlainText));
        let pages = clean(&self.telegram_channels)
            .map(|u| SourceDescriptor::new(u, SourceKind::HtmlScrape));
        json.chain(plain).chain(pages).collect()
    }
}

fn clean(items: &[String]) -> impl Iterator<Item = &str> {
    items.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Load the descriptor file. A missing or malformed file is a configuration error.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::SourcesRead {
        path: path.display().to_string(),
        source: e,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, &ext).map_err(|detail| ConfigError::SourcesParse {
        path: path.display().to_string(),
        detail,
    })
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourcesFile, String> {
    if hint_ext == "toml" {
        return toml::from_str(s).map_err(|e| e.to_string());
    }
    serde_json::from_str(s).map_err(|e| e.to_string())
}
