//! Video-comment collector for a YouTube Data v3-style `commentThreads` API.
//!
//! One collector watches one video. Threads come back newest first, so
//! paging stops once a page reaches comments older than the window start.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{translate_items, Page, SourceCollector};
use crate::client::{FetchRequest, RateLimitedClient};
use crate::error::SentimentError;
use crate::types::{CollectQuery, Platform, RawRecord};

const MAX_RESULTS: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Thread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: Comment,
    #[serde(default)]
    total_reply_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_original: Option<String>,
    text_display: Option<String>,
    published_at: String,
    #[serde(default)]
    like_count: Option<u64>,
}

fn to_record(thread: Thread) -> Option<RawRecord> {
    let replies = thread.snippet.total_reply_count;
    let comment = thread.snippet.top_level_comment;
    let raw_text = comment
        .snippet
        .text_original
        .or(comment.snippet.text_display)?;
    let timestamp = DateTime::parse_from_rfc3339(&comment.snippet.published_at)
        .ok()?
        .with_timezone(&Utc);

    Some(RawRecord {
        source_id: comment.id,
        platform: Platform::Video,
        timestamp,
        raw_text,
        region_hint: None,
        likes: comment.snippet.like_count,
        shares: replies,
    })
}

pub struct VideoCollector {
    client: Arc<RateLimitedClient>,
    base_url: String,
    api_key: String,
    video_id: String,
}

impl VideoCollector {
    #[must_use]
    pub fn new(
        client: Arc<RateLimitedClient>,
        base_url: &str,
        api_key: &str,
        video_id: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            video_id: video_id.to_string(),
        }
    }
}

#[async_trait]
impl SourceCollector for VideoCollector {
    fn platform(&self) -> Platform {
        Platform::Video
    }

    fn name(&self) -> String {
        format!("video:{}", self.video_id)
    }

    async fn fetch_page(
        &self,
        query: &CollectQuery,
        cursor: Option<&str>,
    ) -> Result<Page, SentimentError> {
        let mut request = FetchRequest::get(format!("{}/youtube/v3/commentThreads", self.base_url))
            .param("part", "snippet")
            .param("videoId", self.video_id.clone())
            .param("key", self.api_key.clone())
            .param("order", "time")
            .param("textFormat", "plainText")
            .param("searchTerms", query.query.clone())
            .param("maxResults", query.page_size.clamp(1, MAX_RESULTS).to_string());
        if let Some(token) = cursor {
            request = request.param("pageToken", token);
        }

        let payload = self.client.fetch(&request).await?;
        let response: ThreadListResponse =
            serde_json::from_value(payload).map_err(|e| SentimentError::SourceUnavailable {
                platform: Platform::Video,
                attempts: 1,
                reason: format!("unexpected comment thread shape: {e}"),
            })?;

        let (records, malformed) = translate_items(response.items, Platform::Video, to_record);
        let next_cursor = if records.iter().any(|r| r.timestamp < query.since) {
            None
        } else {
            response.next_page_token
        };

        Ok(Page {
            records,
            malformed,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(text: Option<&str>, published_at: &str) -> Thread {
        serde_json::from_value(serde_json::json!({
            "snippet": {
                "totalReplyCount": 4,
                "topLevelComment": {
                    "id": "c1",
                    "snippet": {
                        "textOriginal": text,
                        "publishedAt": published_at,
                        "likeCount": 12
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn converts_comment_with_metrics() {
        let record = to_record(thread(Some("Great scheme"), "2024-03-01T10:00:00Z")).unwrap();
        assert_eq!(record.source_id, "c1");
        assert_eq!(record.raw_text, "Great scheme");
        assert_eq!(record.likes, Some(12));
        assert_eq!(record.shares, Some(4));
    }

    #[test]
    fn missing_text_is_rejected() {
        assert!(to_record(thread(None, "2024-03-01T10:00:00Z")).is_none());
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        assert!(to_record(thread(Some("hi"), "yesterday")).is_none());
    }
}
