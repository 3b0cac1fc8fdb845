// src/config/settings.rs
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::format::FormatOptions;
use crate::ingest::{CollectOptions, NormalizeOptions};
use crate::notify::delivery::DeliveryOptions;
use crate::notify::pacing::PacingConfig;
use crate::notify::retry::RetryPolicy;
use crate::notify::telegram::DEFAULT_API_BASE;
use crate::notify::ParseMode;
use crate::sampling::SamplingPolicy;
use crate::telemetry::LogFormat;

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHANNEL_ID: &str = "TELEGRAM_CHANNEL_ID";

/// Everything one run needs, resolved from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Both `None` only in dry-run mode.
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub sampling: SamplingPolicy,
    pub per_source_cap: Option<usize>,
    pub batch_size: usize,
    pub extra_source_urls: Vec<String>,
    pub sources_path: PathBuf,
    pub output_path: PathBuf,
    pub normalize: NormalizeOptions,
    pub pin_summary: bool,
    pub pacing: PacingConfig,
    pub fetch_concurrency: usize,
    pub summary_mode: ParseMode,
    pub channel_tag: String,
    pub fallback_to_previous: bool,
    pub dry_run: bool,
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_textfile: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Resolve settings through `get`; blank values count as unset.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let dry_run = parse_bool(&var, "DRY_RUN", false)?;
        let bot_token = var(ENV_BOT_TOKEN);
        let channel_id = var(ENV_CHANNEL_ID);
        if !dry_run {
            if bot_token.is_none() {
                return Err(ConfigError::MissingVar(ENV_BOT_TOKEN));
            }
            if channel_id.is_none() {
                return Err(ConfigError::MissingVar(ENV_CHANNEL_ID));
            }
        }

        let max_proxies: usize = parse_num(&var, "MAX_PROXIES", 1000)?;
        let per_source: usize = parse_num(&var, "MAX_PROXIES_PER_SOURCE", 0)?;
        let batch_size: usize = parse_num::<usize, _>(&var, "BATCH_SIZE", 10)?.max(1);

        let summary_mode = match var("SUMMARY_PARSE_MODE") {
            None => ParseMode::Html,
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "html" => ParseMode::Html,
                "markdown" => ParseMode::Markdown,
                "plain" | "none" => ParseMode::Plain,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SUMMARY_PARSE_MODE",
                        value: v,
                    })
                }
            },
        };

        let log_format = match var("LOG_FORMAT") {
            None => LogFormat::Text,
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LOG_FORMAT",
                value: v,
            })?,
        };

        let seed = match var("SEED") {
            None => None,
            Some(_) => Some(parse_num(&var, "SEED", 0u64)?),
        };

        Ok(Self {
            bot_token,
            channel_id,
            api_base: var("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            request_timeout: Duration::from_secs(parse_num(&var, "REQUEST_TIMEOUT", 30)?),
            retry: RetryPolicy {
                max_attempts: parse_num(&var, "MAX_RETRIES", 3)?,
                base_delay: Duration::from_secs(parse_num(&var, "RETRY_BASE_SECS", 2)?),
                jitter: parse_bool(&var, "RETRY_JITTER", false)?,
            },
            sampling: if max_proxies == 0 {
                SamplingPolicy::unbounded()
            } else {
                SamplingPolicy::capped(max_proxies)
            },
            per_source_cap: (per_source > 0).then_some(per_source),
            batch_size,
            extra_source_urls: var("PROXY_SOURCE_URL")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            sources_path: var("SOURCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("sources.json")),
            output_path: var("PROXIES_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("proxies.txt")),
            normalize: NormalizeOptions {
                strip_trailing_padding: parse_bool(&var, "STRIP_TRAILING_PADDING", false)?,
            },
            pin_summary: parse_bool(&var, "PIN_SUMMARY", true)?,
            pacing: PacingConfig {
                send_gap: Duration::from_secs(parse_num(&var, "SEND_DELAY_SECS", 1)?),
                page_gap: Duration::from_secs(parse_num(&var, "PAGE_DELAY_SECS", 5)?),
            },
            fetch_concurrency: parse_num::<usize, _>(&var, "FETCH_CONCURRENCY", 4)?.max(1),
            summary_mode,
            channel_tag: var("CHANNEL_TAG").unwrap_or_else(|| "@proxyroohejangali".to_string()),
            fallback_to_previous: parse_bool(&var, "FALLBACK_TO_PREVIOUS", true)?,
            dry_run,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            metrics_textfile: var("METRICS_TEXTFILE").map(PathBuf::from),
            seed,
        })
    }

    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            concurrency: self.fetch_concurrency,
            per_source_cap: self.per_source_cap,
        }
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            page_size: self.batch_size,
            summary_mode: self.summary_mode,
            channel_tag: self.channel_tag.clone(),
        }
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions {
            retry: self.retry,
            pacing: self.pacing,
            pin_summary: self.pin_summary,
        }
    }
}

fn parse_num<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: v }),
    }
}

fn parse_bool<F>(var: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(v) = var(key) else {
        return Ok(default);
    };
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: v }),
    }
}
