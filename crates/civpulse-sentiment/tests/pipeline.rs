//! End-to-end pipeline tests with scripted in-memory collectors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use civpulse_core::Taxonomy;
use civpulse_sentiment::{
    demo_collectors, read_upload, Aggregator, CollectQuery, ErrorKind, Page, Pipeline, Platform,
    RawRecord, RecordClassifier, SentimentError, SentimentLabel, SourceCollector,
};

/// What a scripted collector does once its pages run out.
#[derive(Clone, Copy)]
enum Then {
    Finish,
    Fail,
    RateLimit,
    Hang,
}

struct Scripted {
    platform: Platform,
    pages: Vec<Vec<RawRecord>>,
    malformed_per_page: usize,
    then: Then,
}

impl Scripted {
    fn new(platform: Platform, pages: Vec<Vec<RawRecord>>, then: Then) -> Arc<dyn SourceCollector> {
        Self::with_malformed(platform, pages, 0, then)
    }

    fn with_malformed(
        platform: Platform,
        pages: Vec<Vec<RawRecord>>,
        malformed_per_page: usize,
        then: Then,
    ) -> Arc<dyn SourceCollector> {
        Arc::new(Self {
            platform,
            pages,
            malformed_per_page,
            then,
        })
    }
}

#[async_trait]
impl SourceCollector for Scripted {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_page(
        &self,
        _query: &CollectQuery,
        cursor: Option<&str>,
    ) -> Result<Page, SentimentError> {
        let index: usize = cursor.map_or(0, |c| c.parse().unwrap());
        if let Some(records) = self.pages.get(index) {
            let more = index + 1 < self.pages.len() || !matches!(self.then, Then::Finish);
            return Ok(Page {
                records: records.clone(),
                malformed: self.malformed_per_page,
                next_cursor: more.then(|| (index + 1).to_string()),
            });
        }

        match self.then {
            Then::Finish => Ok(Page::default()),
            Then::Fail => Err(SentimentError::SourceUnavailable {
                platform: self.platform,
                attempts: 3,
                reason: "HTTP 503".to_string(),
            }),
            Then::RateLimit => Err(SentimentError::RateLimited {
                platform: self.platform,
                retry_after_secs: 900,
            }),
            Then::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(Page::default())
            }
        }
    }
}

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

fn since() -> DateTime<Utc> {
    at(-60)
}

fn until() -> DateTime<Utc> {
    at(600)
}

fn post(platform: Platform, id: &str, text: &str, minutes: i64) -> RawRecord {
    RawRecord {
        source_id: id.to_string(),
        platform,
        timestamp: at(minutes),
        raw_text: text.to_string(),
        region_hint: None,
        likes: Some(1),
        shares: None,
    }
}

fn pipeline(collectors: Vec<Arc<dyn SourceCollector>>, deadline: Option<Duration>) -> Pipeline {
    Pipeline::new(
        Aggregator::new(collectors, 2, deadline),
        RecordClassifier::new(&Taxonomy::builtin()).unwrap(),
        2,
    )
}

#[tokio::test]
async fn one_failing_source_does_not_abort_the_run() {
    let feed = Scripted::new(
        Platform::Feed,
        vec![vec![
            post(Platform::Feed, "f1", "UPI payments are great", 1),
            post(Platform::Feed, "f2", "Clean India drive in Mumbai", 2),
        ]],
        Then::Finish,
    );
    let forum = Scripted::new(Platform::Forum, Vec::new(), Then::Fail);

    let outcome = pipeline(vec![feed, forum], None)
        .process("digital india", since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.records.len(), 2);
    assert_eq!(outcome.run.errors.len(), 1);
    assert_eq!(outcome.run.errors[0].platform, Some(Platform::Forum));
    assert_eq!(outcome.run.errors[0].kind, ErrorKind::SourceUnavailable);
    assert_eq!(outcome.stats.error_count, 1);
}

#[tokio::test]
async fn failed_source_with_malformed_items_reports_one_error() {
    let forum = Scripted::with_malformed(
        Platform::Forum,
        vec![vec![post(Platform::Forum, "r1", "Jan Dhan accounts helped", 4)]],
        1,
        Then::Fail,
    );

    let outcome = pipeline(vec![forum], None)
        .process("jan dhan", since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.records.len(), 1);
    assert_eq!(outcome.run.errors.len(), 1);
    assert_eq!(outcome.run.errors[0].kind, ErrorKind::SourceUnavailable);
    assert!(outcome.run.errors[0].reason.contains("1 item(s) could not be parsed"));
    assert_eq!(outcome.stats.drops.malformed, 1);
    assert_eq!(outcome.stats.observed, 2);
}

#[tokio::test]
async fn finished_source_summarises_malformed_items() {
    let feed = Scripted::with_malformed(
        Platform::Feed,
        vec![
            vec![post(Platform::Feed, "f1", "UPI is great", 1)],
            vec![post(Platform::Feed, "f2", "UPI is easy", 2)],
        ],
        2,
        Then::Finish,
    );

    let outcome = pipeline(vec![feed], None)
        .process("upi", since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.errors.len(), 1);
    assert_eq!(outcome.run.errors[0].kind, ErrorKind::MalformedRecord);
    assert_eq!(outcome.stats.drops.malformed, 4);
}

#[tokio::test]
async fn rate_limited_source_is_reported_with_its_kind() {
    let video = Scripted::new(
        Platform::Video,
        vec![vec![post(Platform::Video, "v1", "Ayushman Bharat helped", 3)]],
        Then::RateLimit,
    );

    let outcome = pipeline(vec![video], None)
        .process("ayushman", since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.records.len(), 1);
    assert_eq!(outcome.run.errors.len(), 1);
    assert_eq!(outcome.run.errors[0].kind, ErrorKind::RateLimited);
}

#[tokio::test]
async fn merged_records_are_ordered_and_deduplicated() {
    let video = Scripted::new(
        Platform::Video,
        vec![vec![post(Platform::Video, "v1", "same time", 5)]],
        Then::Finish,
    );
    let forum = Scripted::new(
        Platform::Forum,
        vec![
            vec![post(Platform::Forum, "r1", "same time", 5)],
            vec![
                post(Platform::Forum, "r2", "earliest", 0),
                post(Platform::Forum, "r3", "same time", 5),
            ],
        ],
        Then::Finish,
    );

    let outcome = pipeline(vec![video, forum], None)
        .process("q", since(), until())
        .await
        .unwrap();

    let order: Vec<(&str, Platform)> = outcome
        .run
        .records
        .iter()
        .map(|r| (r.normalized.raw.source_id.as_str(), r.platform()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("r2", Platform::Forum),
            ("r1", Platform::Forum),
            ("v1", Platform::Video),
        ]
    );
    assert_eq!(outcome.stats.drops.duplicates, 1);
}

#[tokio::test]
async fn out_of_window_records_are_dropped_and_counted() {
    let feed = Scripted::new(
        Platform::Feed,
        vec![vec![
            post(Platform::Feed, "old", "too early", -120),
            post(Platform::Feed, "ok", "in range", 10),
            post(Platform::Feed, "late", "too late", 900),
        ]],
        Then::Finish,
    );

    let outcome = pipeline(vec![feed], None)
        .process("q", since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.records.len(), 1);
    assert_eq!(outcome.stats.drops.out_of_window, 2);
    assert_eq!(outcome.stats.observed, 3);
}

#[tokio::test(start_paused = true)]
async fn deadline_keeps_partial_results() {
    let quick = Scripted::new(
        Platform::Feed,
        vec![vec![post(Platform::Feed, "f1", "quick source", 1)]],
        Then::Finish,
    );
    let slow = Scripted::new(
        Platform::Forum,
        vec![vec![post(Platform::Forum, "r1", "first page only", 2)]],
        Then::Hang,
    );

    let outcome = pipeline(vec![quick, slow], Some(Duration::from_secs(10)))
        .process("q", since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.records.len(), 2);
    assert_eq!(outcome.run.errors.len(), 1);
    assert_eq!(outcome.run.errors[0].kind, ErrorKind::DeadlineExceeded);
    assert_eq!(outcome.run.errors[0].platform, Some(Platform::Forum));
}

#[tokio::test]
async fn unrepresentable_deadline_means_no_deadline() {
    let feed = Scripted::new(
        Platform::Feed,
        vec![vec![post(Platform::Feed, "f1", "Make in India factories", 1)]],
        Then::Finish,
    );

    let outcome = pipeline(vec![feed], Some(Duration::MAX))
        .process("make in india", since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.records.len(), 1);
    assert!(outcome.run.errors.is_empty());
}

#[tokio::test]
async fn demo_run_satisfies_stats_invariants() {
    let outcome = pipeline(demo_collectors(40, 11), None)
        .process("demo", since(), until())
        .await
        .unwrap();
    let stats = &outcome.stats;

    assert_eq!(stats.total, outcome.run.records.len());
    assert_eq!(stats.per_sentiment_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.per_policy_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.per_region_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.per_platform_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.total + stats.drops.total(), stats.observed);
    assert_eq!(stats.observed, 120);
    assert!(outcome
        .run
        .records
        .iter()
        .all(|r| (-1.0..=1.0).contains(&r.polarity)));
    assert!(outcome
        .run
        .records
        .windows(2)
        .all(|w| w[0].timestamp() <= w[1].timestamp()));
}

#[tokio::test]
async fn repeated_queries_collapse_overlapping_records() {
    let feed = Scripted::new(
        Platform::Feed,
        vec![vec![
            post(Platform::Feed, "f1", "Swachh Bharat is good", 1),
            post(Platform::Feed, "f2", "Clean India needs work", 2),
        ]],
        Then::Finish,
    );

    let queries = vec!["swachh bharat".to_string(), "clean india".to_string()];
    let outcome = pipeline(vec![feed], None)
        .process_queries(&queries, since(), until())
        .await
        .unwrap();

    assert_eq!(outcome.run.query, "swachh bharat | clean india");
    assert_eq!(outcome.stats.total, 2);
    assert_eq!(outcome.stats.observed, 4);
    assert_eq!(outcome.stats.drops.duplicates, 2);
    assert_eq!(outcome.stats.per_policy_counts["Swachh Bharat"], 2);
}

#[tokio::test]
async fn upload_counts_invalid_and_duplicate_rows() {
    let csv = "\
date,text,platform,region
2024-03-05,Digital India is amazing for rural banking! #DigitalIndia,Twitter,
2024-03-05,Digital India is amazing for rural banking! #DigitalIndia,twitter,
2024-03-06,Make in India jobs are terrible here,Reddit,Nagpur
bad-date,whatever,Reddit,
2024-03-07,,YouTube,
";
    let batch = read_upload(csv.as_bytes()).unwrap();
    let outcome = pipeline(Vec::new(), None)
        .process_upload("upload:test.csv", batch)
        .await
        .unwrap();
    let stats = &outcome.stats;

    assert_eq!(stats.observed, 5);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.drops.invalid_rows, 2);
    assert_eq!(stats.drops.duplicates, 1);
    assert_eq!(stats.error_count, 2);
    assert_eq!(stats.total + stats.drops.total(), stats.observed);

    let first = &outcome.run.records[0];
    assert_eq!(first.sentiment_label, SentimentLabel::Positive);
    assert_eq!(first.policy_label, "Digital India");

    let second = &outcome.run.records[1];
    assert_eq!(second.sentiment_label, SentimentLabel::Negative);
    assert_eq!(second.policy_label, "Make in India");
    assert_eq!(second.region_label, "Nagpur");
}

#[tokio::test]
async fn huge_upload_engagement_saturates() {
    let csv = "\
date,text,platform,likes,shares
2024-03-05,UPI is great,twitter,18446744073709551615,18446744073709551615
2024-03-06,UPI is easy,twitter,5,5
";
    let batch = read_upload(csv.as_bytes()).unwrap();
    let outcome = pipeline(Vec::new(), None)
        .process_upload("upload:big.csv", batch)
        .await
        .unwrap();

    assert_eq!(outcome.stats.total, 2);
    assert_eq!(outcome.stats.total_likes, u64::MAX);
    assert_eq!(outcome.stats.total_shares, u64::MAX);
}
