// src/notify/delivery.rs
//! Ordered, paced, retrying delivery of one run's messages.
//!
//! Policy: the summary must be delivered or the run fails; pages are best-effort.
//! Every message walks `Pending -> Sending -> {Delivered | Retry -> Sending | Failed}`.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::counter;
use rand::Rng;
use thiserror::Error;

use super::pacing::{Pacer, PacingConfig, Sleeper};
use super::retry::RetryPolicy;
use super::{Channel, DispatchMessage, MessageId, MessageKind, SendError, SendErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Pending,
    Sending,
    Retry,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    pub kind: MessageKind,
    pub state: DeliveryState,
    pub attempts: u32,
    pub message_id: Option<MessageId>,
    pub last_error: Option<SendError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub summary: MessageOutcome,
    pub pinned: bool,
    /// One entry per page, in page order. Pages skipped after shutdown stay `Pending`.
    pub pages: Vec<MessageOutcome>,
}

impl DeliveryReport {
    pub fn pages_delivered(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.state == DeliveryState::Delivered)
            .count()
    }

    pub fn pages_failed(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.state == DeliveryState::Failed)
            .count()
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("summary not delivered after {attempts} attempts: {last}")]
    SummaryExhausted { attempts: u32, last: SendError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOptions {
    pub retry: RetryPolicy,
    pub pacing: PacingConfig,
    pub pin_summary: bool,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            pacing: PacingConfig::default(),
            pin_summary: true,
        }
    }
}

pub struct DeliveryEngine<'a> {
    channel: &'a dyn Channel,
    sleeper: &'a dyn Sleeper,
    opts: DeliveryOptions,
    shutdown: Option<&'a AtomicBool>,
}

impl<'a> DeliveryEngine<'a> {
    pub fn new(channel: &'a dyn Channel, sleeper: &'a dyn Sleeper, opts: DeliveryOptions) -> Self {
        Self {
            channel,
            sleeper,
            opts,
            shutdown: None,
        }
    }

    /// Stop before the next page once `flag` is set. The in-flight message is not interrupted.
    pub fn with_shutdown(mut self, flag: &'a AtomicBool) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn stop_requested(&self) -> bool {
        self.shutdown
            .map(|f| f.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Send the summary, optionally pin it, then every page in order.
    pub async fn deliver<R: Rng + ?Sized>(
        &self,
        summary: &DispatchMessage,
        pages: &[DispatchMessage],
        rng: &mut R,
    ) -> Result<DeliveryReport, DeliveryError> {
        let mut pacer = Pacer::new(self.sleeper, self.opts.pacing);

        pacer.before_send().await;
        let summary_outcome = self.send_with_retry(summary, &mut *rng).await;
        let summary_id = match (summary_outcome.state, summary_outcome.message_id) {
            (DeliveryState::Delivered, Some(id)) => id,
            _ => {
                let attempts = summary_outcome.attempts;
                let last = summary_outcome
                    .last_error
                    .unwrap_or_else(|| SendError::new(SendErrorKind::Network, "unknown"));
                tracing::error!(attempts, error = %last, "failed to send summary after all retries");
                return Err(DeliveryError::SummaryExhausted { attempts, last });
            }
        };

        let pinned = self.opts.pin_summary && self.pin_best_effort(summary_id).await;

        let mut outcomes: Vec<MessageOutcome> = pages.iter().map(pending).collect();
        for (idx, page) in pages.iter().enumerate() {
            if self.stop_requested() {
                tracing::warn!(
                    remaining = pages.len() - idx,
                    "shutdown requested, not sending remaining pages"
                );
                break;
            }
            if idx == 0 {
                pacer.before_send().await;
            } else {
                pacer.before_next_page().await;
            }

            let outcome = self.send_with_retry(page, &mut *rng).await;
            if outcome.state == DeliveryState::Failed {
                tracing::error!(
                    page = %page.kind,
                    attempts = outcome.attempts,
                    "failed to send page after all retries, continuing"
                );
            }
            outcomes[idx] = outcome;
        }

        let report = DeliveryReport {
            summary: summary_outcome,
            pinned,
            pages: outcomes,
        };
        tracing::info!(
            channel = self.channel.name(),
            pages_delivered = report.pages_delivered(),
            pages_failed = report.pages_failed(),
            pinned,
            "delivery finished"
        );
        Ok(report)
    }

    async fn pin_best_effort(&self, id: MessageId) -> bool {
        match self.channel.pin(id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(message_id = id, error = %e, "pinning summary failed");
                counter!("delivery_pin_failures_total").increment(1);
                false
            }
        }
    }

    async fn send_with_retry<R: Rng + ?Sized>(
        &self,
        msg: &DispatchMessage,
        rng: &mut R,
    ) -> MessageOutcome {
        let max = self.opts.retry.attempts();
        let mut outcome = pending(msg);

        for attempt in 1..=max {
            outcome.state = DeliveryState::Sending;
            outcome.attempts = attempt;
            counter!("delivery_attempts_total").increment(1);

            match self.channel.send(msg).await {
                Ok(id) => {
                    tracing::debug!(kind = %msg.kind, attempt, message_id = id, "message delivered");
                    counter!("delivery_messages_total").increment(1);
                    outcome.state = DeliveryState::Delivered;
                    outcome.message_id = Some(id);
                    outcome.last_error = None;
                    return outcome;
                }
                Err(e) => {
                    tracing::warn!(kind = %msg.kind, attempt, max, error = %e, "send attempt failed");
                    let retry_after = e.retry_after;
                    outcome.last_error = Some(e);
                    if attempt < max {
                        outcome.state = DeliveryState::Retry;
                        let delay = self.opts.retry.delay_for(attempt, retry_after, &mut *rng);
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        counter!("delivery_failures_total").increment(1);
        outcome.state = DeliveryState::Failed;
        outcome
    }
}

fn pending(msg: &DispatchMessage) -> MessageOutcome {
    MessageOutcome {
        kind: msg.kind,
        state: DeliveryState::Pending,
        attempts: 0,
        message_id: None,
        last_error: None,
    }
}
