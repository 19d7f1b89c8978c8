use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, FeedSettings, ForumSettings, RetrySettings, VideoSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parse `var` (or `default` when unset) into `T`.
fn parse_or<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Split a comma-separated list, dropping blank entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let log_level = or_default("CIVPULSE_LOG_LEVEL", "info");
    let taxonomy_path = optional("CIVPULSE_TAXONOMY_PATH").map(PathBuf::from);
    let request_timeout_secs = parse_or(&lookup, "CIVPULSE_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("CIVPULSE_USER_AGENT", "civpulse/0.1 (policy-sentiment)");
    let max_concurrent_sources: usize =
        parse_or(&lookup, "CIVPULSE_MAX_CONCURRENT_SOURCES", "3")?;

    let max_attempts: u32 = parse_or(&lookup, "CIVPULSE_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "CIVPULSE_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let retry = RetrySettings {
        max_attempts,
        backoff_base_ms: parse_or(&lookup, "CIVPULSE_BACKOFF_BASE_MS", "500")?,
        backoff_cap_ms: parse_or(&lookup, "CIVPULSE_BACKOFF_CAP_MS", "8000")?,
    };

    let quota_limit = parse_or(&lookup, "CIVPULSE_QUOTA_LIMIT", "60")?;
    let quota_window_secs: u64 = parse_or(&lookup, "CIVPULSE_QUOTA_WINDOW_SECS", "900")?;
    if quota_window_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "CIVPULSE_QUOTA_WINDOW_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let max_pages = parse_or(&lookup, "CIVPULSE_MAX_PAGES", "5")?;
    let page_size = parse_or(&lookup, "CIVPULSE_PAGE_SIZE", "50")?;
    let classify_workers: usize = parse_or(&lookup, "CIVPULSE_CLASSIFY_WORKERS", "4")?;

    let run_deadline_secs = match optional("CIVPULSE_RUN_DEADLINE_SECS") {
        Some(raw) => Some(
            raw.parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: "CIVPULSE_RUN_DEADLINE_SECS".to_string(),
                    reason: e.to_string(),
                })?,
        ),
        None => None,
    };

    let feed = FeedSettings {
        base_url: or_default("FEED_BASE_URL", "https://api.twitter.com"),
        bearer_token: optional("FEED_BEARER_TOKEN"),
    };
    let forum = ForumSettings {
        base_url: or_default("FORUM_BASE_URL", "https://www.reddit.com"),
        subreddits: split_list(&or_default("FORUM_SUBREDDITS", "india")),
    };
    let video = VideoSettings {
        base_url: or_default("VIDEO_BASE_URL", "https://www.googleapis.com"),
        api_key: optional("VIDEO_API_KEY"),
        video_ids: split_list(&or_default("VIDEO_IDS", "")),
    };

    Ok(AppConfig {
        log_level,
        taxonomy_path,
        request_timeout_secs,
        user_agent,
        max_concurrent_sources: max_concurrent_sources.max(1),
        retry,
        quota_limit,
        quota_window_secs,
        max_pages,
        page_size,
        classify_workers: classify_workers.max(1),
        run_deadline_secs,
        feed,
        forum,
        video,
    })
}
