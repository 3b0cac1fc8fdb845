// src/pipeline.rs
//! One end-to-end run: collect, dedup, persist, sample, format, deliver.

use std::sync::atomic::AtomicBool;

use chrono::{DateTime, Utc};
use metrics::gauge;
use rand::Rng;

use crate::config::Settings;
use crate::error::RunError;
use crate::format::{Formatter, SummaryStats};
use crate::ingest::providers::provider_for;
use crate::ingest::types::{SourceDescriptor, SourceProvider};
use crate::ingest::{collect_links, normalize_dedup};
use crate::notify::delivery::{DeliveryEngine, DeliveryReport};
use crate::notify::pacing::Sleeper;
use crate::notify::Channel;
use crate::persist::ProxyFileWriter;

/// Providers for `descs`, same order, sharing one HTTP client.
pub fn build_providers(
    descs: &[SourceDescriptor],
    client: &reqwest::Client,
) -> Vec<Box<dyn SourceProvider>> {
    descs.iter().map(|d| provider_for(d, client)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    /// Unique links after dedup.
    pub collected: usize,
    /// Links that went into pages.
    pub published: usize,
    /// The previous output file stood in for an empty collection.
    pub used_fallback: bool,
    /// Lines written to the output file; `None` if nothing was written.
    pub persisted: Option<usize>,
    pub delivery: DeliveryReport,
}

pub struct Pipeline<'a> {
    settings: &'a Settings,
    providers: &'a [Box<dyn SourceProvider>],
    channel: &'a dyn Channel,
    sleeper: &'a dyn Sleeper,
    shutdown: Option<&'a AtomicBool>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        providers: &'a [Box<dyn SourceProvider>],
        channel: &'a dyn Channel,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            settings,
            providers,
            channel,
            sleeper,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, flag: &'a AtomicBool) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Run once. Fails only when the summary could not be delivered.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<RunReport, RunError> {
        let s = self.settings;
        let writer = ProxyFileWriter::new(&s.output_path);

        let collected = collect_links(self.providers, s.collect_options()).await;
        let mut candidates = collected.candidates;
        let mut used_fallback = false;

        if candidates.is_empty() && s.fallback_to_previous {
            match writer.read_previous() {
                Ok(prev) if !prev.is_empty() => {
                    tracing::warn!(
                        path = %writer.path().display(),
                        count = prev.len(),
                        "no links collected, republishing previous list"
                    );
                    candidates = prev;
                    used_fallback = true;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %writer.path().display(), error = %e, "previous list unreadable")
                }
            }
        }

        let (batch, stats) = normalize_dedup(candidates, s.normalize);
        tracing::info!(
            sources_ok = collected.sources_ok,
            sources_failed = collected.sources_failed,
            raw = stats.raw,
            duplicates = stats.duplicates,
            unique = batch.len(),
            "collection finished"
        );

        // An empty batch leaves the previous file in place for the command bot.
        let persisted = if batch.is_empty() {
            None
        } else {
            match writer.write(batch.iter()) {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::error!(path = %writer.path().display(), error = %e, "failed to save proxies, continuing");
                    None
                }
            }
        };

        let published = s.sampling.sample(&batch, &mut *rng);
        if published.len() < batch.len() {
            tracing::info!(total = batch.len(), published = published.len(), "sampled links for publishing");
        }

        let formatter = Formatter::new(s.format_options());
        let summary = formatter.summary(
            SummaryStats {
                collected: batch.len(),
                published: published.len(),
            },
            now,
        );
        let pages = formatter.pages(&published, &mut *rng);

        let mut engine = DeliveryEngine::new(self.channel, self.sleeper, s.delivery_options());
        if let Some(flag) = self.shutdown {
            engine = engine.with_shutdown(flag);
        }
        let delivered = engine.deliver(&summary, &pages, &mut *rng).await;
        gauge!("pipeline_last_run_ts").set(now.timestamp() as f64);

        Ok(RunReport {
            sources_ok: collected.sources_ok,
            sources_failed: collected.sources_failed,
            collected: batch.len(),
            published: published.len(),
            used_fallback,
            persisted,
            delivery: delivered?,
        })
    }
}
