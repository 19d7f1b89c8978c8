//! Offline collector producing synthetic civic posts.
//!
//! Used by the `demo` command and in tests. Output is a pure function of
//! `(platform, seed, index, window)`, so paging is stable and two runs with
//! the same seed yield the same records.

use async_trait::async_trait;
use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Page, SourceCollector};
use crate::error::SentimentError;
use crate::types::{CollectQuery, Platform, RawRecord};

const SAMPLE_POSTS: &[&str] = &[
    "Digital India initiative has made government services more accessible online",
    "Swachh Bharat mission has improved cleanliness in our city significantly",
    "Make in India policy is boosting local manufacturing jobs",
    "Jan Dhan Yojana helped my family open their first bank account",
    "Ayushman Bharat provides good healthcare coverage for poor families",
    "Digital payments are now easier thanks to government initiatives",
    "Clean India mission still needs more work in rural areas",
    "Manufacturing sector growing well under current policies",
    "Financial inclusion programs reaching remote villages effectively",
    "Healthcare reforms showing positive results in urban areas",
    "Government's digital push facing challenges in rural connectivity",
    "Cleanliness drives working well in my neighborhood",
    "Local industries benefiting from government manufacturing policies",
    "Banking services improved significantly in last few years",
    "Health insurance schemes helping middle class families",
];

const SENTIMENT_SUFFIXES: &[&str] = &[
    "great",
    "excellent",
    "amazing",
    "poor",
    "terrible",
    "disappointing",
];

const DEMO_REGIONS: &[&str] = &[
    "Mumbai",
    "Delhi",
    "Bangalore",
    "Chennai",
    "Kolkata",
    "Hyderabad",
];

const SUFFIX_PROBABILITY: f64 = 0.3;

pub struct DemoCollector {
    platform: Platform,
    total: usize,
    seed: u64,
}

impl DemoCollector {
    #[must_use]
    pub fn new(platform: Platform, total: usize, seed: u64) -> Self {
        Self {
            platform,
            total,
            seed,
        }
    }

    fn rng_for(&self, index: usize) -> StdRng {
        let platform_salt: u64 = match self.platform {
            Platform::Feed => 0x9e37_79b9,
            Platform::Forum => 0x85eb_ca6b,
            Platform::Video => 0xc2b2_ae35,
        };
        StdRng::seed_from_u64(
            self.seed
                .wrapping_mul(0x0100_0000_01b3)
                .wrapping_add(platform_salt)
                .wrapping_add(index as u64),
        )
    }

    fn generate(&self, index: usize, query: &CollectQuery) -> RawRecord {
        let mut rng = self.rng_for(index);

        let mut text = SAMPLE_POSTS[rng.random_range(0..SAMPLE_POSTS.len())].to_string();
        if rng.random_bool(SUFFIX_PROBABILITY) {
            text.push(' ');
            text.push_str(SENTIMENT_SUFFIXES[rng.random_range(0..SENTIMENT_SUFFIXES.len())]);
        }

        let span = (query.until - query.since).num_seconds().max(0);
        let offset = rng.random_range(0..=span);
        let region = DEMO_REGIONS[rng.random_range(0..DEMO_REGIONS.len())];

        RawRecord {
            source_id: format!("demo-{}-{index}", self.platform),
            platform: self.platform,
            timestamp: query.since + Duration::seconds(offset),
            raw_text: text,
            region_hint: Some(region.to_string()),
            likes: Some(rng.random_range(1..1000)),
            shares: Some(rng.random_range(0..100)),
        }
    }
}

#[async_trait]
impl SourceCollector for DemoCollector {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn name(&self) -> String {
        format!("demo:{}", self.platform)
    }

    async fn fetch_page(
        &self,
        query: &CollectQuery,
        cursor: Option<&str>,
    ) -> Result<Page, SentimentError> {
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let page_size = usize::try_from(query.page_size).unwrap_or(usize::MAX).max(1);
        let end = start.saturating_add(page_size).min(self.total);

        let records = (start..end).map(|i| self.generate(i, query)).collect();
        let next_cursor = (end < self.total).then(|| end.to_string());

        Ok(Page {
            records,
            malformed: 0,
            next_cursor,
        })
    }
}
