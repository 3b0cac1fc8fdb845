// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod notify;
pub mod persist;
pub mod pipeline;
pub mod sampling;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::Settings;
pub use crate::error::{ConfigError, RunError};
pub use crate::ingest::types::{ProxyBatch, ProxyLink, SourceDescriptor, SourceKind};
pub use crate::notify::{Channel, DispatchMessage, LogChannel};
pub use crate::pipeline::{build_providers, Pipeline, RunReport};
