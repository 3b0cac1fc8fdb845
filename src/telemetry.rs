// src/telemetry.rs
//! Logging setup and the run's Prometheus textfile.

use std::path::Path;
use std::str::FromStr;

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::persist::{write_atomic, PersistError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" | "compact" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
/// Calling twice is harmless; the second call is ignored.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let res = match format {
        LogFormat::Text => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Register help text for every series the pipeline emits.
pub fn describe_metrics() {
    DESCRIBED.get_or_init(|| {
        describe_counter!("collect_links_total", "Candidate links extracted, by source kind");
        describe_counter!("collect_source_errors_total", "Sources that failed to fetch or parse");
        describe_counter!("collect_json_fallbacks_total", "JSON bodies that fell back to text scanning");
        describe_counter!("collect_duplicates_total", "Candidates dropped as duplicates");
        describe_counter!("delivery_attempts_total", "Send attempts, retries included");
        describe_counter!("delivery_messages_total", "Messages delivered");
        describe_counter!("delivery_failures_total", "Messages abandoned after the last retry");
        describe_counter!("delivery_pin_failures_total", "Summary pins that failed");
        describe_gauge!("pipeline_last_run_ts", "Unix time the last run finished");
    });
}

/// Install the Prometheus recorder. Returns `None` if another recorder is already set.
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_metrics();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    }
}

/// Dump the current metrics in exposition format for a textfile collector.
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> Result<(), PersistError> {
    write_atomic(path, &handle.render())
}
