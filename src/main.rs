//! Proxy relay: one collection-and-delivery run per invocation.
//! Scheduling is left to cron or a CI timer; exit status reports whether the summary went out.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tg_proxy_relay::config::settings::{ENV_BOT_TOKEN, ENV_CHANNEL_ID};
use tg_proxy_relay::config::{load_sources, Settings};
use tg_proxy_relay::error::ConfigError;
use tg_proxy_relay::ingest::providers::new_client;
use tg_proxy_relay::notify::pacing::TokioSleeper;
use tg_proxy_relay::notify::telegram::TelegramChannel;
use tg_proxy_relay::notify::{Channel, LogChannel};
use tg_proxy_relay::telemetry::{self, LogFormat};
use tg_proxy_relay::{build_providers, Pipeline, RunError};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            telemetry::init_tracing("info", LogFormat::default());
            tracing::error!(error = %RunError::from(e), "run failed");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init_tracing(&settings.log_level, settings.log_format);

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), RunError> {
    let sources = load_sources(&settings.sources_path)?;
    let descriptors = sources.descriptors(&settings.extra_source_urls);
    tracing::info!(
        sources = descriptors.len(),
        dry_run = settings.dry_run,
        "starting run"
    );

    let metrics = match &settings.metrics_textfile {
        Some(_) => telemetry::install_metrics(),
        None => None,
    };

    let client = new_client(settings.request_timeout)?;
    let providers = build_providers(&descriptors, &client);
    let channel = make_channel(&settings)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_signal_listener(shutdown.clone());

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let sleeper = TokioSleeper;
    let result = Pipeline::new(&settings, &providers, channel.as_ref(), &sleeper)
        .with_shutdown(&shutdown)
        .run(&mut rng, Utc::now())
        .await;

    if let (Some(handle), Some(path)) = (&metrics, &settings.metrics_textfile) {
        if let Err(e) = telemetry::write_textfile(handle, path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write metrics textfile");
        }
    }

    let report = result?;
    tracing::info!(
        collected = report.collected,
        published = report.published,
        pages_delivered = report.delivery.pages_delivered(),
        pages_failed = report.delivery.pages_failed(),
        "run finished"
    );
    Ok(())
}

fn make_channel(settings: &Settings) -> Result<Box<dyn Channel>, ConfigError> {
    if settings.dry_run {
        return Ok(Box::new(LogChannel::new()));
    }
    let token = settings
        .bot_token
        .as_deref()
        .ok_or(ConfigError::MissingVar(ENV_BOT_TOKEN))?;
    let chat = settings
        .channel_id
        .as_deref()
        .ok_or(ConfigError::MissingVar(ENV_CHANNEL_ID))?;
    Ok(Box::new(
        TelegramChannel::new(token, chat)
            .with_api_base(settings.api_base.clone())
            .with_timeout(settings.request_timeout),
    ))
}

/// Flip `flag` on SIGINT or SIGTERM. Delivery checks it between pages.
fn spawn_signal_listener(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::warn!("termination signal received, finishing in-flight message");
        flag.store(true, Ordering::Relaxed);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
