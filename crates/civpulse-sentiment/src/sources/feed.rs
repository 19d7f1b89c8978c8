//! Social-feed collector using a v2-style recent-search endpoint.
//!
//! `GET {base}/2/tweets/search/recent?query=..&start_time=..&end_time=..`
//! returns `{ data: [post], meta: { next_token } }`; the window is applied
//! server-side.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use super::{translate_items, Page, SourceCollector};
use crate::client::{FetchRequest, RateLimitedClient};
use crate::error::SentimentError;
use crate::types::{CollectQuery, Platform, RawRecord};

const MIN_RESULTS: u32 = 10;
const MAX_RESULTS: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    meta: Option<SearchMeta>,
}

#[derive(Debug, Deserialize)]
struct SearchMeta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    text: String,
    created_at: String,
    #[serde(default)]
    public_metrics: Option<PublicMetrics>,
    #[serde(default)]
    geo: Option<Geo>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
}

#[derive(Debug, Deserialize)]
struct Geo {
    full_name: Option<String>,
}

pub struct FeedCollector {
    client: Arc<RateLimitedClient>,
    base_url: String,
    bearer_token: String,
}

impl FeedCollector {
    #[must_use]
    pub fn new(client: Arc<RateLimitedClient>, base_url: &str, bearer_token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
        }
    }

    fn request(&self, query: &CollectQuery, cursor: Option<&str>) -> FetchRequest {
        let max_results = query.page_size.clamp(MIN_RESULTS, MAX_RESULTS);
        let mut request = FetchRequest::get(format!("{}/2/tweets/search/recent", self.base_url))
            .bearer(&self.bearer_token)
            .param("query", query.query.clone())
            .param("max_results", max_results.to_string())
            .param(
                "start_time",
                query.since.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .param(
                "end_time",
                query.until.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .param("tweet.fields", "created_at,public_metrics,geo");
        if let Some(token) = cursor {
            request = request.param("next_token", token);
        }
        request
    }
}

fn to_record(post: Post) -> Option<RawRecord> {
    let timestamp = DateTime::parse_from_rfc3339(&post.created_at)
        .ok()?
        .with_timezone(&Utc);
    let region_hint = post
        .geo
        .and_then(|g| g.full_name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    Some(RawRecord {
        source_id: post.id,
        platform: Platform::Feed,
        timestamp,
        raw_text: post.text,
        region_hint,
        likes: post.public_metrics.as_ref().map(|m| m.like_count),
        shares: post.public_metrics.as_ref().map(|m| m.retweet_count),
    })
}

#[async_trait]
impl SourceCollector for FeedCollector {
    fn platform(&self) -> Platform {
        Platform::Feed
    }

    async fn fetch_page(
        &self,
        query: &CollectQuery,
        cursor: Option<&str>,
    ) -> Result<Page, SentimentError> {
        let payload = self.client.fetch(&self.request(query, cursor)).await?;
        let response: SearchResponse =
            serde_json::from_value(payload).map_err(|e| SentimentError::SourceUnavailable {
                platform: Platform::Feed,
                attempts: 1,
                reason: format!("unexpected search response shape: {e}"),
            })?;

        let (records, malformed) = translate_items(response.data, Platform::Feed, to_record);
        Ok(Page {
            records,
            malformed,
            next_cursor: response.meta.and_then(|m| m.next_token),
        })
    }
}
