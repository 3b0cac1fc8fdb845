use std::io;

use thiserror::Error;

use crate::notify::delivery::DeliveryError;

/// Fatal before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("reading source descriptors from {path}: {source}")]
    SourcesRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("parsing source descriptors in {path}: {detail}")]
    SourcesParse { path: String, detail: String },
}

/// Errors that fail a run and set a non-zero exit status.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("building HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}
