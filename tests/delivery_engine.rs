// tests/delivery_engine.rs
mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use common::ScriptedChannel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tg_proxy_relay::notify::delivery::{
    DeliveryEngine, DeliveryError, DeliveryOptions, DeliveryState,
};
use tg_proxy_relay::notify::pacing::RecordingSleeper;
use tg_proxy_relay::notify::{DispatchMessage, MessageKind, ParseMode};

fn msg(kind: MessageKind) -> DispatchMessage {
    DispatchMessage {
        kind,
        text: kind.to_string(),
        parse_mode: ParseMode::Plain,
        disable_preview: true,
    }
}

fn page(n: usize, total: usize) -> MessageKind {
    MessageKind::Page { number: n, total }
}

fn pages(total: usize) -> Vec<DispatchMessage> {
    (1..=total).map(|n| msg(page(n, total))).collect()
}

#[tokio::test]
async fn summary_then_pages_in_order_with_pin() {
    let ch = ScriptedChannel::new();
    let sleeper = RecordingSleeper::new();
    let engine = DeliveryEngine::new(&ch, &sleeper, DeliveryOptions::default());
    let mut rng = StdRng::seed_from_u64(1);

    let report = engine
        .deliver(&msg(MessageKind::Summary), &pages(3), &mut rng)
        .await
        .unwrap();

    assert_eq!(
        ch.delivered_kinds(),
        vec![MessageKind::Summary, page(1, 3), page(2, 3), page(3, 3)]
    );
    assert!(report.pinned);
    assert_eq!(*ch.pins.lock(), vec![101]);
    assert_eq!(report.pages_delivered(), 3);
    // send gap before page 1, page gap before pages 2 and 3
    assert_eq!(
        sleeper.recorded(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(5),
            Duration::from_secs(5)
        ]
    );
}

#[tokio::test]
async fn summary_exhausting_retries_fails_the_run() {
    let ch = ScriptedChannel::new().failing(MessageKind::Summary, u32::MAX);
    let sleeper = RecordingSleeper::new();
    let engine = DeliveryEngine::new(&ch, &sleeper, DeliveryOptions::default());
    let mut rng = StdRng::seed_from_u64(1);

    let err = engine
        .deliver(&msg(MessageKind::Summary), &pages(2), &mut rng)
        .await
        .unwrap_err();

    let DeliveryError::SummaryExhausted { attempts, .. } = err;
    assert_eq!(attempts, 3);
    assert_eq!(ch.attempts_for(MessageKind::Summary), 3);
    // no page is attempted once the summary is lost
    assert_eq!(ch.attempts.lock().len(), 3);
    // backoff 2s then 4s, nothing after the last attempt
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test]
async fn failing_page_is_skipped_and_run_still_succeeds() {
    let ch = ScriptedChannel::new().failing(page(2, 3), u32::MAX);
    let sleeper = RecordingSleeper::new();
    let engine = DeliveryEngine::new(&ch, &sleeper, DeliveryOptions::default());
    let mut rng = StdRng::seed_from_u64(1);

    let report = engine
        .deliver(&msg(MessageKind::Summary), &pages(3), &mut rng)
        .await
        .unwrap();

    assert_eq!(ch.attempts_for(page(2, 3)), 3);
    assert_eq!(report.pages[1].state, DeliveryState::Failed);
    assert_eq!(report.pages[1].attempts, 3);
    assert_eq!(report.pages_failed(), 1);
    assert_eq!(
        ch.delivered_kinds(),
        vec![MessageKind::Summary, page(1, 3), page(3, 3)]
    );
}

#[tokio::test]
async fn transient_failure_recovers_within_budget() {
    let ch = ScriptedChannel::new().failing(MessageKind::Summary, 2);
    let sleeper = RecordingSleeper::new();
    let engine = DeliveryEngine::new(&ch, &sleeper, DeliveryOptions::default());
    let mut rng = StdRng::seed_from_u64(1);

    let report = engine
        .deliver(&msg(MessageKind::Summary), &[], &mut rng)
        .await
        .unwrap();

    assert_eq!(report.summary.state, DeliveryState::Delivered);
    assert_eq!(report.summary.attempts, 3);
    assert!(report.summary.last_error.is_none());
}

#[tokio::test]
async fn pin_failure_is_not_fatal() {
    let ch = ScriptedChannel {
        fail_pin: true,
        ..ScriptedChannel::new()
    };
    let sleeper = RecordingSleeper::new();
    let engine = DeliveryEngine::new(&ch, &sleeper, DeliveryOptions::default());
    let mut rng = StdRng::seed_from_u64(1);

    let report = engine
        .deliver(&msg(MessageKind::Summary), &pages(1), &mut rng)
        .await
        .unwrap();

    assert!(!report.pinned);
    assert_eq!(report.pages_delivered(), 1);
}

#[tokio::test]
async fn pinning_can_be_disabled() {
    let ch = ScriptedChannel::new();
    let sleeper = RecordingSleeper::new();
    let opts = DeliveryOptions {
        pin_summary: false,
        ..DeliveryOptions::default()
    };
    let engine = DeliveryEngine::new(&ch, &sleeper, opts);
    let mut rng = StdRng::seed_from_u64(1);

    let report = engine
        .deliver(&msg(MessageKind::Summary), &[], &mut rng)
        .await
        .unwrap();

    assert!(!report.pinned);
    assert!(ch.pins.lock().is_empty());
}

#[tokio::test]
async fn shutdown_stops_before_the_next_page() {
    let flag = Arc::new(AtomicBool::new(false));
    // summary + first page delivered, then the signal arrives
    let ch = ScriptedChannel {
        stop_after: Some((2, flag.clone())),
        ..ScriptedChannel::new()
    };
    let sleeper = RecordingSleeper::new();
    let engine =
        DeliveryEngine::new(&ch, &sleeper, DeliveryOptions::default()).with_shutdown(&flag);
    let mut rng = StdRng::seed_from_u64(1);

    let report = engine
        .deliver(&msg(MessageKind::Summary), &pages(4), &mut rng)
        .await
        .unwrap();

    assert_eq!(ch.delivered_kinds(), vec![MessageKind::Summary, page(1, 4)]);
    assert_eq!(report.pages_delivered(), 1);
    assert_eq!(report.pages[1].state, DeliveryState::Pending);
    assert_eq!(report.pages[3].state, DeliveryState::Pending);
}
