use std::path::PathBuf;

/// Retry policy shared by every source client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts per fetch, including the first try.
    pub max_attempts: u32,
    /// Base delay for exponential backoff: `backoff_base_ms * 2^attempt`.
    pub backoff_base_ms: u64,
    /// Upper bound applied to every computed delay.
    pub backoff_cap_ms: u64,
}

/// Social-feed (recent search) source settings. The source is disabled when
/// no bearer token is configured.
#[derive(Clone)]
pub struct FeedSettings {
    pub base_url: String,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ForumSettings {
    pub base_url: String,
    pub subreddits: Vec<String>,
}

/// Video-comment source settings. The source is disabled unless both an API
/// key and at least one video id are configured.
#[derive(Clone)]
pub struct VideoSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub video_ids: Vec<String>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub taxonomy_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_sources: usize,
    pub retry: RetrySettings,
    pub quota_limit: u32,
    pub quota_window_secs: u64,
    pub max_pages: usize,
    pub page_size: u32,
    pub classify_workers: usize,
    pub run_deadline_secs: Option<u64>,
    pub feed: FeedSettings,
    pub forum: ForumSettings,
    pub video: VideoSettings,
}

impl std::fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSettings")
            .field("base_url", &self.base_url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl std::fmt::Debug for VideoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("video_ids", &self.video_ids)
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("taxonomy_path", &self.taxonomy_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_sources", &self.max_concurrent_sources)
            .field("retry", &self.retry)
            .field("quota_limit", &self.quota_limit)
            .field("quota_window_secs", &self.quota_window_secs)
            .field("max_pages", &self.max_pages)
            .field("page_size", &self.page_size)
            .field("classify_workers", &self.classify_workers)
            .field("run_deadline_secs", &self.run_deadline_secs)
            .field("feed", &self.feed)
            .field("forum", &self.forum)
            .field("video", &self.video)
            .finish()
    }
}
