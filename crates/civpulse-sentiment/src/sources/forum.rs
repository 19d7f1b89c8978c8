//! Forum collector for a Reddit-style listing API.
//!
//! Searches one community (`/r/{name}/search.json`) sorted newest first and
//! pages with the listing's `after` cursor. Paging stops early once a page
//! reaches posts older than the window start.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{translate_items, Page, SourceCollector};
use crate::client::{FetchRequest, RateLimitedClient};
use crate::error::SentimentError;
use crate::types::{CollectQuery, Platform, RawRecord};

const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    title: Option<String>,
    selftext: Option<String>,
    created_utc: f64,
    #[serde(default)]
    ups: Option<u64>,
    #[serde(default)]
    num_comments: Option<u64>,
}

fn usable(text: Option<&str>) -> Option<&str> {
    text.map(str::trim)
        .filter(|t| !matches!(*t, "[deleted]" | "[removed]"))
}

/// Title followed by the self text, skipping moderator placeholders.
/// `None` when the post carries neither field.
fn post_text(title: Option<&str>, selftext: Option<&str>) -> Option<String> {
    if title.is_none() && selftext.is_none() {
        return None;
    }
    let parts: Vec<&str> = [usable(title), usable(selftext)]
        .into_iter()
        .flatten()
        .filter(|t| !t.is_empty())
        .collect();
    Some(parts.join(" "))
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

pub struct ForumCollector {
    client: Arc<RateLimitedClient>,
    base_url: String,
    subreddit: String,
    region_hint: Option<String>,
}

impl ForumCollector {
    #[must_use]
    pub fn new(client: Arc<RateLimitedClient>, base_url: &str, subreddit: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            subreddit: subreddit.trim_start_matches("r/").to_string(),
            region_hint: None,
        }
    }

    /// Attach a region hint to every record from this community, e.g. a
    /// city subreddit.
    #[must_use]
    pub fn with_region_hint(mut self, region_hint: Option<String>) -> Self {
        self.region_hint = region_hint;
        self
    }

    fn to_record(&self, post: PostData) -> Option<RawRecord> {
        let raw_text = post_text(post.title.as_deref(), post.selftext.as_deref())?;
        let timestamp = from_epoch_secs(post.created_utc)?;
        Some(RawRecord {
            source_id: post.id,
            platform: Platform::Forum,
            timestamp,
            raw_text,
            region_hint: self.region_hint.clone(),
            likes: post.ups,
            shares: post.num_comments,
        })
    }
}

#[async_trait]
impl SourceCollector for ForumCollector {
    fn platform(&self) -> Platform {
        Platform::Forum
    }

    fn name(&self) -> String {
        format!("forum:r/{}", self.subreddit)
    }

    async fn fetch_page(
        &self,
        query: &CollectQuery,
        cursor: Option<&str>,
    ) -> Result<Page, SentimentError> {
        let mut request =
            FetchRequest::get(format!("{}/r/{}/search.json", self.base_url, self.subreddit))
                .param("q", query.query.clone())
                .param("sort", "new")
                .param("restrict_sr", "on")
                .param("limit", query.page_size.clamp(1, MAX_LIMIT).to_string());
        if let Some(after) = cursor {
            request = request.param("after", after);
        }

        let payload = self.client.fetch(&request).await?;
        let listing: Listing =
            serde_json::from_value(payload).map_err(|e| SentimentError::SourceUnavailable {
                platform: Platform::Forum,
                attempts: 1,
                reason: format!("unexpected listing shape: {e}"),
            })?;

        let items = listing.data.children.into_iter().map(|c| c.data).collect();
        let (records, malformed) =
            translate_items(items, Platform::Forum, |post: PostData| self.to_record(post));

        let reached_window_start = records.iter().any(|r| r.timestamp < query.since);
        let next_cursor = if reached_window_start {
            None
        } else {
            listing.data.after
        };

        Ok(Page {
            records,
            malformed,
            next_cursor,
        })
    }
}
