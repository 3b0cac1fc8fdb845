//! Prints the reply the command bot sends for `/proxies`.
//! Reads PROXIES_OUTPUT_PATH (default `proxies.txt`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;

use tg_proxy_relay::persist::{reply_text, REPLY_MAX_CHARS};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let path = std::env::var("PROXIES_OUTPUT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("proxies.txt"));

    match reply(&path) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "failed to build reply");
            ExitCode::FAILURE
        }
    }
}

fn reply(path: &Path) -> anyhow::Result<String> {
    reply_text(path, REPLY_MAX_CHARS)
        .with_context(|| format!("reading proxy list {}", path.display()))
}
