// src/ingest/providers/mod.rs
pub mod channel_page;
pub mod json_api;
pub mod plain_text;

use std::time::Duration;

use crate::ingest::types::{FetchError, FetchErrorKind, SourceDescriptor, SourceKind, SourceProvider};

use self::channel_page::ChannelPageProvider;
use self::json_api::JsonApiProvider;
use self::plain_text::PlainTextProvider;

/// Where a provider reads its payload from.
#[derive(Debug, Clone)]
pub(crate) enum Mode {
    /// In-memory body; used by tests and offline runs.
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl Mode {
    pub(crate) fn label(&self) -> &str {
        match self {
            Mode::Fixture(_) => "fixture",
            Mode::Http { url, .. } => url,
        }
    }

    pub(crate) async fn body(&self) -> Result<String, FetchError> {
        match self {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => fetch_body(client, url).await,
        }
    }
}

/// Shared HTTP client for all source fetches; the timeout bounds every request.
pub fn new_client(request_timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .connect_timeout(request_timeout)
        .user_agent(concat!("tg-proxy-relay/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// GET `url` and return the body; non-2xx is an error.
pub async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| FetchError::new(FetchErrorKind::InvalidUrl, url, e.to_string()))?;

    let resp = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| map_reqwest_error(url, e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FetchErrorKind::HttpStatus(status.as_u16()),
            url,
            status.to_string(),
        ));
    }

    resp.text().await.map_err(|e| map_reqwest_error(url, e))
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FetchErrorKind::Timeout, url, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FetchErrorKind::Malformed, url, err.to_string());
    }
    FetchError::new(FetchErrorKind::Network, url, err.to_string())
}

/// Build the provider matching a descriptor's kind.
pub fn provider_for(desc: &SourceDescriptor, client: &reqwest::Client) -> Box<dyn SourceProvider> {
    match desc.kind {
        SourceKind::PlainText => Box::new(PlainTextProvider::from_url(&desc.url, client.clone())),
        SourceKind::JsonArray | SourceKind::JsonObject => Box::new(JsonApiProvider::from_url(
            &desc.url,
            desc.kind,
            client.clone(),
        )),
        SourceKind::HtmlScrape => {
            Box::new(ChannelPageProvider::from_url(&desc.url, client.clone()))
        }
    }
}
