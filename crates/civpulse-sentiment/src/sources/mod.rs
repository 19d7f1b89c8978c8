//! Source collector abstraction and the platform implementations.
//!
//! A collector turns one platform's native paged API into [`RawRecord`]s.
//! Pages are pulled lazily through [`SourceCollector::collect`], so a long
//! time window never has to be materialized at once.

mod demo;
mod feed;
mod forum;
mod video;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use civpulse_core::AppConfig;
use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;

pub use demo::DemoCollector;
pub use feed::FeedCollector;
pub use forum::ForumCollector;
pub use video::VideoCollector;

use crate::client::{RateLimitedClient, RetryPolicy};
use crate::error::SentimentError;
use crate::quota::SourceQuota;
use crate::types::{CollectQuery, Platform, RawRecord};

/// One batch of records from a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<RawRecord>,
    /// Items in the native payload that could not be translated.
    pub malformed: usize,
    /// Cursor for the next page; `None` when the source is exhausted.
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait SourceCollector: Send + Sync {
    fn platform(&self) -> Platform;

    /// Short human-readable name for logs, e.g. `forum:r/india`.
    fn name(&self) -> String {
        self.platform().to_string()
    }

    /// Fetch the page identified by `cursor` (`None` for the first page).
    async fn fetch_page(
        &self,
        query: &CollectQuery,
        cursor: Option<&str>,
    ) -> Result<Page, SentimentError>;

    /// Lazily page through the source, stopping after `query.max_pages`
    /// pages or when the source has no further cursor.
    fn collect<'a>(&'a self, query: &'a CollectQuery) -> BoxStream<'a, Result<Page, SentimentError>> {
        collect_pages(self, query)
    }
}

/// `(cursor, pages fetched)`; `None` once paging is finished.
type PagingState = Option<(Option<String>, usize)>;

fn collect_pages<'a, C>(
    collector: &'a C,
    query: &'a CollectQuery,
) -> BoxStream<'a, Result<Page, SentimentError>>
where
    C: SourceCollector + ?Sized,
{
    stream::try_unfold(Some((None, 0)), move |state| {
        next_page(collector, query, state)
    })
    .boxed()
}

async fn next_page<C>(
    collector: &C,
    query: &CollectQuery,
    state: PagingState,
) -> Result<Option<(Page, PagingState)>, SentimentError>
where
    C: SourceCollector + ?Sized,
{
    let Some((cursor, fetched)) = state else {
        return Ok(None);
    };
    if fetched >= query.max_pages {
        return Ok(None);
    }

    let page = collector.fetch_page(query, cursor.as_deref()).await?;
    tracing::debug!(
        source = %collector.name(),
        page = fetched + 1,
        records = page.records.len(),
        malformed = page.malformed,
        "collected page"
    );

    let next = page.next_cursor.clone().map(|c| (Some(c), fetched + 1));
    Ok(Some((page, next)))
}

/// Translate native items into records, counting the ones that fail either
/// deserialization or `convert`.
pub(crate) fn translate_items<T, F>(
    items: Vec<serde_json::Value>,
    platform: Platform,
    convert: F,
) -> (Vec<RawRecord>, usize)
where
    T: DeserializeOwned,
    F: Fn(T) -> Option<RawRecord>,
{
    let mut records = Vec::with_capacity(items.len());
    let mut malformed = 0;

    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(native) => match convert(native) {
                Some(record) => records.push(record),
                None => {
                    tracing::debug!(platform = %platform, "skipping item without usable text or timestamp");
                    malformed += 1;
                }
            },
            Err(e) => {
                tracing::debug!(platform = %platform, error = %e, "skipping malformed item");
                malformed += 1;
            }
        }
    }

    (records, malformed)
}

/// Parse a `name` or `name=Region` forum entry.
fn parse_forum_entry(entry: &str) -> (String, Option<String>) {
    match entry.split_once('=') {
        Some((name, region)) => {
            let region = region.trim();
            (
                name.trim().to_string(),
                (!region.is_empty()).then(|| region.to_string()),
            )
        }
        None => (entry.trim().to_string(), None),
    }
}

fn platform_client(
    config: &AppConfig,
    platform: Platform,
) -> Result<Arc<RateLimitedClient>, SentimentError> {
    let quota = SourceQuota::new(
        config.quota_limit,
        Duration::from_secs(config.quota_window_secs),
    );
    let client = RateLimitedClient::build(
        platform,
        config.request_timeout_secs,
        &config.user_agent,
        quota,
        RetryPolicy::from(config.retry),
    )?;
    Ok(Arc::new(client))
}

/// Build every live collector the configuration enables.
///
/// Collectors of the same platform share one [`RateLimitedClient`], and so
/// one quota. The feed source needs a bearer token and the video source
/// needs an API key plus video ids; missing credentials disable the source
/// with a log line rather than an error.
///
/// # Errors
///
/// Returns [`SentimentError::Http`] if an HTTP client cannot be constructed.
pub fn build_collectors(
    config: &AppConfig,
) -> Result<Vec<Arc<dyn SourceCollector>>, SentimentError> {
    let mut collectors: Vec<Arc<dyn SourceCollector>> = Vec::new();

    match &config.feed.bearer_token {
        Some(token) => {
            let client = platform_client(config, Platform::Feed)?;
            collectors.push(Arc::new(FeedCollector::new(
                client,
                &config.feed.base_url,
                token,
            )));
        }
        None => tracing::info!(platform = "feed", "no bearer token configured, source disabled"),
    }

    if config.forum.subreddits.is_empty() {
        tracing::info!(platform = "forum", "no subreddits configured, source disabled");
    } else {
        let client = platform_client(config, Platform::Forum)?;
        for entry in &config.forum.subreddits {
            let (subreddit, region_hint) = parse_forum_entry(entry);
            let collector = ForumCollector::new(Arc::clone(&client), &config.forum.base_url, &subreddit)
                .with_region_hint(region_hint);
            collectors.push(Arc::new(collector));
        }
    }

    match &config.video.api_key {
        Some(key) if !config.video.video_ids.is_empty() => {
            let client = platform_client(config, Platform::Video)?;
            for video_id in &config.video.video_ids {
                collectors.push(Arc::new(VideoCollector::new(
                    Arc::clone(&client),
                    &config.video.base_url,
                    key,
                    video_id,
                )));
            }
        }
        _ => tracing::info!(
            platform = "video",
            "no API key or video ids configured, source disabled"
        ),
    }

    Ok(collectors)
}

/// One [`DemoCollector`] per platform, all sharing `seed`.
#[must_use]
pub fn demo_collectors(posts_per_platform: usize, seed: u64) -> Vec<Arc<dyn SourceCollector>> {
    [Platform::Feed, Platform::Forum, Platform::Video]
        .into_iter()
        .map(|platform| {
            Arc::new(DemoCollector::new(platform, posts_per_platform, seed)) as Arc<dyn SourceCollector>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forum_entry_without_region() {
        assert_eq!(parse_forum_entry(" india "), ("india".to_string(), None));
    }

    #[test]
    fn forum_entry_with_region() {
        assert_eq!(
            parse_forum_entry("mumbai=Mumbai"),
            ("mumbai".to_string(), Some("Mumbai".to_string()))
        );
    }

    #[test]
    fn forum_entry_with_blank_region() {
        assert_eq!(parse_forum_entry("delhi= "), ("delhi".to_string(), None));
    }

    #[test]
    fn translate_items_counts_failures() {
        #[derive(serde::Deserialize)]
        struct Item {
            text: String,
        }

        let items = vec![
            serde_json::json!({"text": "ok"}),
            serde_json::json!({"nope": 1}),
            serde_json::json!({"text": ""}),
        ];
        let (records, malformed) = translate_items(items, Platform::Feed, |item: Item| {
            (!item.text.is_empty()).then(|| RawRecord {
                source_id: "1".to_string(),
                platform: Platform::Feed,
                timestamp: chrono::Utc::now(),
                raw_text: item.text,
                region_hint: None,
                likes: None,
                shares: None,
            })
        });
        assert_eq!(records.len(), 1);
        assert_eq!(malformed, 2);
    }
}
