// src/notify/pacing.rs
use std::time::Duration;

use async_trait::async_trait;

/// Suspends the current task. Injected so pacing and backoff can be tested without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, d: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

/// Spacing between consecutive sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Minimum gap between any two sends.
    pub send_gap: Duration,
    /// Gap between two page messages; never shorter than `send_gap`.
    pub page_gap: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            send_gap: Duration::from_secs(1),
            page_gap: Duration::from_secs(5),
        }
    }
}

/// Orders sends in time: the first send goes out immediately, every later
/// send waits at least the requested gap after the previous one.
pub struct Pacer<'a> {
    sleeper: &'a dyn Sleeper,
    cfg: PacingConfig,
    sent_any: bool,
}

impl<'a> Pacer<'a> {
    pub fn new(sleeper: &'a dyn Sleeper, cfg: PacingConfig) -> Self {
        Self {
            sleeper,
            cfg,
            sent_any: false,
        }
    }

    /// Wait before a non-page send (or the first page after the summary).
    pub async fn before_send(&mut self) {
        self.wait(self.cfg.send_gap).await;
    }

    /// Wait before a page that follows another page.
    pub async fn before_next_page(&mut self) {
        self.wait(self.cfg.page_gap.max(self.cfg.send_gap)).await;
    }

    async fn wait(&mut self, gap: Duration) {
        if self.sent_any && !gap.is_zero() {
            self.sleeper.sleep(gap).await;
        }
        self.sent_any = true;
    }
}

// --- Test helper ---
/// Records requested sleeps and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pub calls: std::sync::Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.calls.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, d: Duration) {
        if let Ok(mut v) = self.calls.lock() {
            v.push(d);
        }
    }
}
