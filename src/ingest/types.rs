// src/ingest/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// A shareable proxy URI as it was found in a source.
///
/// Identity is decided on the normalized form (see [`crate::ingest::normalize_link`]),
/// but the stored string is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyLink(String);

impl ProxyLink {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProxyLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProxyLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    PlainText,
    JsonArray,
    JsonObject,
    HtmlScrape,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::PlainText => "plain-text",
            SourceKind::JsonArray => "json-array",
            SourceKind::JsonObject => "json-object",
            SourceKind::HtmlScrape => "html-scrape",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub url: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn new(url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Ordered, duplicate-free links produced by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyBatch {
    links: Vec<ProxyLink>,
}

impl ProxyBatch {
    /// Callers are responsible for uniqueness; use [`crate::ingest::normalize_dedup`].
    pub(crate) fn from_unique(links: Vec<ProxyLink>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[ProxyLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProxyLink> {
        self.links.iter()
    }
}

impl<'a> IntoIterator for &'a ProxyBatch {
    type Item = &'a ProxyLink;
    type IntoIter = std::slice::Iter<'a, ProxyLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    InvalidUrl,
    Timeout,
    HttpStatus(u16),
    Network,
    Malformed,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::InvalidUrl => write!(f, "invalid url"),
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            FetchErrorKind::Network => write!(f, "network error"),
            FetchErrorKind::Malformed => write!(f, "malformed payload"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} fetching {url}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FetchErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }
}

/// One external source of raw candidate links.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_links(&self) -> Result<Vec<String>, FetchError>;
    fn name(&self) -> &str;
    fn kind(&self) -> SourceKind;
}
