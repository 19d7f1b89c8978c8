//! Configuration for the civpulse policy-sentiment pipeline.
//!
//! Environment-driven runtime settings live in [`AppConfig`]; the policy and
//! region keyword tables (plus scorer lexicon additions) live in a YAML
//! [`Taxonomy`] file, or fall back to [`Taxonomy::builtin`].

pub mod app_config;
pub mod config;
pub mod taxonomy;

use thiserror::Error;

pub use app_config::{AppConfig, FeedSettings, ForumSettings, RetrySettings, VideoSettings};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use taxonomy::{
    load_taxonomy, parse_taxonomy, queries_for_policy, KeywordGroup, LexiconEntry, Taxonomy,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read taxonomy file {path}: {source}")]
    TaxonomyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse taxonomy file: {0}")]
    TaxonomyFileParse(#[from] serde_yaml::Error),

    #[error("taxonomy validation failed: {0}")]
    Validation(String),
}
