// src/ingest/providers/plain_text.rs
use async_trait::async_trait;
use metrics::counter;

use super::Mode;
use crate::ingest::extract::extract_proxy_uris;
use crate::ingest::types::{FetchError, SourceKind, SourceProvider};

/// A text document (e.g. a raw list on a code host) scanned for proxy URIs.
pub struct PlainTextProvider {
    mode: Mode,
}

impl PlainTextProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: &str, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }
}

#[async_trait]
impl SourceProvider for PlainTextProvider {
    async fn fetch_links(&self) -> Result<Vec<String>, FetchError> {
        let body = self.mode.body().await?;
        let links = extract_proxy_uris(&body);
        counter!("collect_links_total", "kind" => "plain-text").increment(links.len() as u64);
        tracing::info!(url = self.name(), count = links.len(), "fetched plain-text source");
        Ok(links)
    }

    fn name(&self) -> &str {
        self.mode.label()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::PlainText
    }
}
