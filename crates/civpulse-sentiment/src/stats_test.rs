use chrono::{TimeZone, Utc};

use super::*;
use crate::types::{NormalizedRecord, Platform, RawRecord};

fn classified(
    platform: Platform,
    month: u32,
    polarity: f64,
    label: SentimentLabel,
    policy: &str,
    region: &str,
) -> ClassifiedRecord {
    let raw = RawRecord {
        source_id: format!("{platform}-{policy}-{month}"),
        platform,
        timestamp: Utc.with_ymd_and_hms(2024, month, 10, 12, 0, 0).unwrap(),
        raw_text: format!("{policy} {region}"),
        region_hint: None,
        likes: Some(10),
        shares: None,
    };
    ClassifiedRecord {
        record_id: raw.record_id(),
        normalized: NormalizedRecord {
            clean_text: raw.raw_text.to_lowercase(),
            low_confidence: false,
            raw,
        },
        polarity,
        sentiment_label: label,
        policy_label: policy.to_string(),
        region_label: region.to_string(),
    }
}

fn run_with(records: Vec<ClassifiedRecord>) -> PipelineRun<ClassifiedRecord> {
    let mut run = PipelineRun::new(
        "q",
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
    );
    run.observed = records.len() + 2;
    run.drops.duplicates = 2;
    run.records = records;
    run
}

fn sample() -> PipelineRun<ClassifiedRecord> {
    run_with(vec![
        classified(Platform::Feed, 1, 0.6, SentimentLabel::Positive, "Digital India", "Delhi"),
        classified(Platform::Forum, 1, -0.4, SentimentLabel::Negative, "Swachh Bharat", "Mumbai"),
        classified(Platform::Forum, 2, 0.0, SentimentLabel::Neutral, "Digital India", "Mumbai"),
        classified(Platform::Video, 2, 0.2, SentimentLabel::Positive, "Uncategorized", "Unknown"),
    ])
}

#[test]
fn counts_sum_to_total() {
    let stats = RunStats::from_run(&sample());
    assert_eq!(stats.total, 4);
    assert_eq!(stats.per_sentiment_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.per_policy_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.per_region_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.per_platform_counts.values().sum::<usize>(), stats.total);
    assert_eq!(stats.total + stats.drops.total(), stats.observed);
}

#[test]
fn empty_run_reports_all_sentiment_labels() {
    let stats = RunStats::from_run(&run_with(Vec::new()));
    assert_eq!(stats.total, 0);
    assert_eq!(stats.per_sentiment_counts.len(), 3);
    assert!(stats.per_sentiment_counts.values().all(|&c| c == 0));
    assert_eq!(stats.insights, Insights::default());
    assert_eq!(stats.mean_polarity, 0.0);
    assert_eq!(stats.percent(SentimentLabel::Positive), 0.0);
}

#[test]
fn monthly_buckets_by_calendar_month() {
    let stats = RunStats::from_run(&sample());
    assert_eq!(stats.monthly.len(), 2);
    assert_eq!(stats.monthly["2024-01"]["positive"], 1);
    assert_eq!(stats.monthly["2024-01"]["negative"], 1);
    assert_eq!(stats.monthly["2024-02"]["neutral"], 1);
    assert_eq!(stats.monthly["2024-02"]["negative"], 0);
}

#[test]
fn insights_rank_by_mean_polarity() {
    let stats = RunStats::from_run(&sample());
    let insights = &stats.insights;
    assert_eq!(
        insights.most_positive_policy.as_ref().unwrap().label,
        "Digital India"
    );
    assert_eq!(
        insights.most_criticised_policy.as_ref().unwrap().label,
        "Swachh Bharat"
    );
    assert_eq!(insights.most_positive_region.as_ref().unwrap().label, "Delhi");
    assert_eq!(insights.most_positive_platform.as_ref().unwrap().label, "feed");
}

#[test]
fn insight_ties_go_to_first_name() {
    let stats = RunStats::from_run(&run_with(vec![
        classified(Platform::Feed, 3, 0.5, SentimentLabel::Positive, "Zeta", "Pune"),
        classified(Platform::Feed, 3, 0.5, SentimentLabel::Positive, "Alpha", "Pune"),
    ]));
    assert_eq!(
        stats.insights.most_positive_policy.unwrap().label,
        "Alpha"
    );
    assert_eq!(
        stats.insights.most_criticised_policy.unwrap().label,
        "Alpha"
    );
}

#[test]
fn engagement_and_percentages() {
    let stats = RunStats::from_run(&sample());
    assert_eq!(stats.total_likes, 40);
    assert_eq!(stats.total_shares, 0);
    assert!((stats.percent(SentimentLabel::Positive) - 50.0).abs() < 1e-9);
    assert!((stats.mean_polarity - 0.1).abs() < 1e-9);
}
