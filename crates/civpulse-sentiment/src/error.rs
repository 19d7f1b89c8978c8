use thiserror::Error;

use crate::types::Platform;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The local quota is spent, or the platform answered 429 and is cooling
    /// down. Retry after `retry_after_secs`.
    #[error("{platform} rate limited (retry after {retry_after_secs}s)")]
    RateLimited {
        platform: Platform,
        retry_after_secs: u64,
    },

    /// Terminal for the source in this run.
    #[error("{platform} unavailable after {attempts} attempt(s): {reason}")]
    SourceUnavailable {
        platform: Platform,
        attempts: u32,
        reason: String,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("upload read error: {0}")]
    Upload(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] civpulse_core::ConfigError),

    #[error("classification worker failed: {0}")]
    Worker(String),
}
