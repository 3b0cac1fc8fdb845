// src/ingest/mod.rs
pub mod extract;
pub mod providers;
pub mod types;

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use metrics::counter;

use crate::ingest::types::{ProxyBatch, ProxyLink, SourceProvider};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Strip trailing `=` padding before comparing. Changes link equality, so off by default.
    pub strip_trailing_padding: bool,
}

const WEB_SCHEME: &str = "https://t.me/proxy?";
const APP_SCHEME: &str = "tg://proxy?";

/// Rewrite the web form `https://t.me/proxy?...` to `tg://proxy?...`, keeping the query.
pub fn canonical_scheme(link: &str) -> String {
    match link.strip_prefix(WEB_SCHEME) {
        Some(query) => format!("{APP_SCHEME}{query}"),
        None => link.to_string(),
    }
}

/// Publishable form of a stored link: trimmed, one leading `@` dropped, `&amp;` unescaped.
pub fn clean_link(raw: &str) -> String {
    let s = raw.trim();
    let s = s.strip_prefix('@').unwrap_or(s);
    s.replace("&amp;", "&")
}

/// Canonical comparison key for a raw link.
pub fn normalize_link(raw: &str, opts: NormalizeOptions) -> String {
    // Whitespace, '@' scrape artifact, escaped ampersands, then one scheme
    let mut out = canonical_scheme(&clean_link(raw));
    // Optional base64 padding
    if opts.strip_trailing_padding {
        let keep = out.trim_end_matches('=').len();
        out.truncate(keep);
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub raw: usize,
    pub empty: usize,
    pub duplicates: usize,
}

/// Keep the first occurrence of every normalized link, in input order.
/// The stored value is the raw candidate minus surrounding whitespace.
pub fn normalize_dedup(raw: Vec<String>, opts: NormalizeOptions) -> (ProxyBatch, DedupStats) {
    let mut stats = DedupStats {
        raw: raw.len(),
        ..DedupStats::default()
    };
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut keep = Vec::with_capacity(raw.len());

    for candidate in raw {
        let key = normalize_link(&candidate, opts);
        if key.is_empty() {
            stats.empty += 1;
            continue;
        }
        if !seen.insert(key) {
            stats.duplicates += 1;
            continue;
        }
        keep.push(ProxyLink::new(candidate.trim()));
    }

    counter!("collect_duplicates_total").increment(stats.duplicates as u64);
    (ProxyBatch::from_unique(keep), stats)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectOptions {
    /// Parallel fetches in flight at once (at least 1).
    pub concurrency: usize,
    /// Keep only the first N candidates per source; `None` = unlimited.
    pub per_source_cap: Option<usize>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            per_source_cap: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub candidates: Vec<String>,
    pub sources_ok: usize,
    pub sources_failed: usize,
}

/// Fetch every provider (bounded parallelism) and concatenate candidates in provider order.
/// A failing provider is logged and contributes nothing.
pub async fn collect_links(
    providers: &[Box<dyn SourceProvider>],
    opts: CollectOptions,
) -> CollectReport {
    let results: Vec<_> = stream::iter(providers.iter())
        .map(|p| async move { (p, p.fetch_links().await) })
        // `buffered` yields in input order regardless of completion order.
        .buffered(opts.concurrency.max(1))
        .collect()
        .await;

    let mut report = CollectReport::default();
    for (p, res) in results {
        match res {
            Ok(mut links) => {
                if let Some(cap) = opts.per_source_cap {
                    links.truncate(cap);
                }
                tracing::debug!(source = p.name(), kind = %p.kind(), count = links.len(), "source collected");
                report.sources_ok += 1;
                report.candidates.append(&mut links);
            }
            Err(e) => {
                tracing::warn!(
                    source = p.name(),
                    kind = %p.kind(),
                    error_kind = %e.kind,
                    error = %e,
                    "source fetch failed, skipping"
                );
                counter!("collect_source_errors_total").increment(1);
                report.sources_failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_applies_steps_in_order() {
        let opts = NormalizeOptions::default();
        assert_eq!(
            normalize_link("  @tg://proxy?server=a&amp;port=1  ", opts),
            "tg://proxy?server=a&port=1"
        );
        // Only one '@' is stripped
        assert_eq!(normalize_link("@@x", opts), "@x");
        // Padding untouched unless asked
        assert_eq!(normalize_link("secret==", opts), "secret==");
        let strip = NormalizeOptions {
            strip_trailing_padding: true,
        };
        assert_eq!(normalize_link("secret==", strip), "secret");
    }

    #[test]
    fn first_seen_variant_wins() {
        let raw = strs(&[
            "tg://proxy?server=a&port=1&secret=s==",
            "tg://proxy?server=a&port=1&secret=s",
            "@tg://proxy?server=a&amp;port=1&amp;secret=s=",
            "tg://proxy?server=b&port=1&secret=t",
        ]);
        let opts = NormalizeOptions {
            strip_trailing_padding: true,
        };
        let (batch, stats) = normalize_dedup(raw, opts);
        let got: Vec<&str> = batch.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "tg://proxy?server=a&port=1&secret=s==",
                "tg://proxy?server=b&port=1&secret=t"
            ]
        );
        assert_eq!(stats.duplicates, 2);
    }

    #[test]
    fn web_and_app_schemes_collapse_to_first_seen() {
        let raw = strs(&[
            "https://t.me/proxy?server=A&port=1&secret=S",
            "tg://proxy?server=A&port=1&secret=S",
        ]);
        let (batch, stats) = normalize_dedup(raw, NormalizeOptions::default());
        assert_eq!(batch.len(), 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(
            batch.links()[0].as_str(),
            "https://t.me/proxy?server=A&port=1&secret=S"
        );
    }

    #[test]
    fn clean_link_keeps_padding_and_scheme() {
        assert_eq!(
            clean_link(" @https://t.me/proxy?server=a&amp;secret=s== "),
            "https://t.me/proxy?server=a&secret=s=="
        );
    }

    #[test]
    fn padding_variants_are_distinct_without_flag() {
        let raw = strs(&["x=", "x", "x"]);
        let (batch, stats) = normalize_dedup(raw, NormalizeOptions::default());
        assert_eq!(batch.len(), 2);
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn blanks_are_dropped_silently() {
        let raw = strs(&["", "   ", "@", "tg://proxy?server=a"]);
        let (batch, stats) = normalize_dedup(raw, NormalizeOptions::default());
        assert_eq!(batch.len(), 1);
        assert_eq!(stats.empty, 3);
        assert_eq!(stats.raw, 4);
    }
}
