// tests/metrics.rs
mod common;

use common::ScriptedChannel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tg_proxy_relay::ingest::providers::plain_text::PlainTextProvider;
use tg_proxy_relay::ingest::types::SourceProvider;
use tg_proxy_relay::notify::pacing::RecordingSleeper;
use tg_proxy_relay::notify::MessageKind;
use tg_proxy_relay::telemetry;
use tg_proxy_relay::Pipeline;

#[tokio::test]
async fn run_metrics_are_rendered_to_textfile() {
    // Only one global recorder per process; this file holds the single test that installs it.
    let handle = telemetry::install_metrics().expect("recorder");

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("proxies.txt").display().to_string();
    let settings = common::settings_with(&[("PROXIES_OUTPUT_PATH", out.as_str())]);

    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(PlainTextProvider::from_fixture(
        "tg://proxy?server=1.1.1.1&port=443&secret=aa\n\
         tg://proxy?server=1.1.1.1&port=443&secret=aa",
    ))];
    let ch = ScriptedChannel::new().failing(MessageKind::Page { number: 1, total: 1 }, 1);
    let sleeper = RecordingSleeper::new();
    let mut rng = StdRng::seed_from_u64(1);

    Pipeline::new(&settings, &providers, &ch, &sleeper)
        .run(&mut rng, chrono::Utc::now())
        .await
        .unwrap();

    let prom = dir.path().join("relay.prom");
    telemetry::write_textfile(&handle, &prom).unwrap();
    let text = std::fs::read_to_string(&prom).unwrap();

    for name in [
        "collect_links_total",
        "collect_duplicates_total",
        "delivery_attempts_total",
        "delivery_messages_total",
        "pipeline_last_run_ts",
    ] {
        assert!(text.contains(name), "missing {name} in:\n{text}");
    }
    // summary once, page twice (one scripted failure)
    assert!(text.contains("delivery_attempts_total 3"));
}
