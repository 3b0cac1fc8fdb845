// src/ingest/extract.rs
//! Pulling candidate proxy links out of raw payloads.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// `tg://proxy?...` or the web equivalent `https://t.me/proxy?...`.
/// Quotes and angle brackets terminate a match so links embedded in JSON or HTML come out clean.
static RE_PROXY_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:tg://proxy\?|https://t\.me/proxy\?)[^\s"'<>`]+"#).unwrap()
});

/// All proxy-URI substrings of `text`, in order of appearance.
pub fn extract_proxy_uris(text: &str) -> Vec<String> {
    RE_PROXY_URI
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Fields tried, in order, when an entry has no `host`/`port`/`secret` triple.
const LINK_FIELDS: [&str; 3] = ["link", "url", "proxy"];

/// Build a canonical `tg://proxy` URI from a JSON entry, or fall back to an explicit link field.
pub fn link_from_entry(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            let triple = (map.get("host"), map.get("port"), map.get("secret"));
            if let (Some(host), Some(port), Some(secret)) = triple {
                return Some(format!(
                    "tg://proxy?server={}&port={}&secret={}",
                    scalar_to_string(host),
                    scalar_to_string(port),
                    scalar_to_string(secret)
                ));
            }
            LINK_FIELDS
                .iter()
                .filter_map(|k| map.get(*k))
                .find_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                    _ => None,
                })
        }
        _ => None,
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Links from a parsed JSON payload: a top-level array of entries,
/// or an object carrying them under `proxies`.
pub fn links_from_json(payload: &Value) -> Vec<String> {
    let entries: &[Value] = match payload {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("proxies") {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    };
    entries.iter().filter_map(link_from_entry).collect()
}
