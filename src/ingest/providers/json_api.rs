// src/ingest/providers/json_api.rs
use async_trait::async_trait;
use metrics::counter;

use super::Mode;
use crate::ingest::extract::{extract_proxy_uris, links_from_json};
use crate::ingest::types::{FetchError, SourceKind, SourceProvider};

/// A JSON endpoint listing proxies, either as a top-level array of entries
/// or as an object with a `proxies` array. Both shapes are accepted whatever
/// the descriptor says, since endpoints are frequently mislabeled.
pub struct JsonApiProvider {
    mode: Mode,
    kind: SourceKind,
}

impl JsonApiProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            kind: SourceKind::JsonArray,
        }
    }

    pub fn from_url(url: &str, kind: SourceKind, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
            kind,
        }
    }

    /// Parse as JSON; when that fails, scan the raw body for proxy URIs instead.
    pub(crate) fn parse_body(&self, body: &str) -> Vec<String> {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(payload) => links_from_json(&payload),
            Err(e) => {
                tracing::warn!(
                    url = self.name(),
                    error = %e,
                    "invalid JSON payload, falling back to pattern extraction"
                );
                counter!("collect_json_fallbacks_total").increment(1);
                extract_proxy_uris(body)
            }
        }
    }
}

#[async_trait]
impl SourceProvider for JsonApiProvider {
    async fn fetch_links(&self) -> Result<Vec<String>, FetchError> {
        let body = self.mode.body().await?;
        let links = self.parse_body(&body);
        counter!("collect_links_total", "kind" => self.kind.as_str()).increment(links.len() as u64);
        tracing::info!(url = self.name(), count = links.len(), "fetched JSON source");
        Ok(links)
    }

    fn name(&self) -> &str {
        self.mode.label()
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn array_entries_are_synthesized() {
        let p = JsonApiProvider::from_fixture(
            r#"[{"host":"1.1.1.1","port":443,"secret":"dd"},{"link":"tg://proxy?server=x&port=2&secret=y"}]"#,
        );
        let out = p.fetch_links().await.unwrap();
        assert_eq!(
            out,
            vec![
                "tg://proxy?server=1.1.1.1&port=443&secret=dd".to_string(),
                "tg://proxy?server=x&port=2&secret=y".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn broken_json_recovers_embedded_link() {
        let p = JsonApiProvider::from_fixture(
            r#"[{"link": "tg://proxy?server=z&port=3&secret=q"},,, oops"#,
        );
        let out = p.fetch_links().await.unwrap();
        assert_eq!(out, vec!["tg://proxy?server=z&port=3&secret=q".to_string()]);
    }
}
