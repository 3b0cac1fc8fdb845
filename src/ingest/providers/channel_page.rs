// src/ingest/providers/channel_page.rs
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::Mode;
use crate::ingest::types::{FetchError, SourceKind, SourceProvider};

/// Visible anchor label ("proxy" in Persian) used by channel preview pages.
pub const PROXY_ANCHOR_LABEL: &str = "پروکسی";

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// A public channel preview page; every anchor labelled [`PROXY_ANCHOR_LABEL`] carries a link.
pub struct ChannelPageProvider {
    mode: Mode,
}

impl ChannelPageProvider {
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

/// `href` values of anchors whose whole visible text is the proxy label.
pub fn scrape_proxy_anchors(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&ANCHOR)
        .filter(|a| a.text().collect::<String>().trim() == PROXY_ANCHOR_LABEL)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SourceProvider for ChannelPageProvider {
    async fn fetch_links(&self) -> Result<Vec<String>, FetchError> {
        let body = self.mode.body().await?;
        let links = scrape_proxy_anchors(&body);
        counter!("collect_links_total", "kind" => "html-scrape").increment(links.len() as u64);
        tracing::info!(url = self.name(), count = links.len(), "scraped channel page");
        Ok(links)
    }

    fn name(&self) -> &str {
        self.mode.label()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::HtmlScrape
    }
}
