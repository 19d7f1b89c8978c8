//! Fan-out/fan-in over the configured collectors.
//!
//! Each collector is drained concurrently (bounded by `max_concurrent`); the
//! per-source outcomes are merged in configured order, filtered to the time
//! window, sorted by `(timestamp, platform)` and deduplicated. A failing or
//! timed-out source contributes whatever pages it delivered plus one
//! [`SourceError`]; it never aborts the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use crate::error::SentimentError;
use crate::sources::SourceCollector;
use crate::types::{CollectQuery, ErrorKind, PipelineRun, Platform, RawRecord, SourceError};

/// Paging limits applied to every collector in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_size: u32,
    pub max_pages: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 5,
        }
    }
}

/// Everything one collector produced before finishing, failing or running
/// out of time.
#[derive(Debug, Default)]
pub(crate) struct SourceOutcome {
    pub(crate) records: Vec<RawRecord>,
    pub(crate) malformed: usize,
    pub(crate) errors: Vec<SourceError>,
}

pub struct Aggregator {
    collectors: Vec<Arc<dyn SourceCollector>>,
    max_concurrent: usize,
    deadline: Option<Duration>,
    limits: PageLimits,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        collectors: Vec<Arc<dyn SourceCollector>>,
        max_concurrent: usize,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            collectors,
            max_concurrent: max_concurrent.max(1),
            deadline,
            limits: PageLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn collectors(&self) -> &[Arc<dyn SourceCollector>] {
        &self.collectors
    }

    /// Collect `query` over `[since, until]` from every source.
    pub async fn run(
        &self,
        query: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> PipelineRun<RawRecord> {
        let collect_query = CollectQuery {
            query: query.to_string(),
            since,
            until,
            page_size: self.limits.page_size,
            max_pages: self.limits.max_pages,
        };
        let now = Instant::now();
        // An unrepresentable deadline is no deadline.
        let deadline_at = self.deadline.and_then(|d| now.checked_add(d));

        let outcomes: Vec<SourceOutcome> = stream::iter(self.collectors.iter())
            .map(|collector| drain(collector.as_ref(), &collect_query, deadline_at))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let run = merge(PipelineRun::new(query, since, until), outcomes);
        tracing::info!(
            run_id = %run.run_id,
            query,
            sources = self.collectors.len(),
            records = run.records.len(),
            observed = run.observed,
            duplicates = run.drops.duplicates,
            out_of_window = run.drops.out_of_window,
            errors = run.errors.len(),
            "aggregation finished"
        );
        run
    }

    /// Run several queries over the same window and merge them into one run,
    /// collapsing records that more than one query returned.
    pub async fn run_many(
        &self,
        queries: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> PipelineRun<RawRecord> {
        let mut combined = PipelineRun::new(&queries.join(" | "), since, until);
        let mut records = Vec::new();

        for query in queries {
            let run = self.run(query, since, until).await;
            combined.observed += run.observed - run.records.len();
            combined.drops.malformed += run.drops.malformed;
            combined.drops.invalid_rows += run.drops.invalid_rows;
            combined.drops.duplicates += run.drops.duplicates;
            combined.drops.out_of_window += run.drops.out_of_window;
            combined.errors.extend(run.errors);
            records.extend(run.records);
        }

        merge(
            combined,
            vec![SourceOutcome {
                records,
                ..SourceOutcome::default()
            }],
        )
    }
}

fn source_error(platform: Platform, err: &SentimentError) -> SourceError {
    let kind = match err {
        SentimentError::RateLimited { .. } => ErrorKind::RateLimited,
        _ => ErrorKind::SourceUnavailable,
    };
    SourceError::new(platform, kind, err.to_string())
}

async fn drain(
    collector: &dyn SourceCollector,
    query: &CollectQuery,
    deadline_at: Option<Instant>,
) -> SourceOutcome {
    let mut outcome = SourceOutcome::default();
    let mut pages = collector.collect(query);

    loop {
        let next = match deadline_at {
            Some(at) => match tokio::time::timeout_at(at, pages.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!(
                        source = %collector.name(),
                        records = outcome.records.len(),
                        "run deadline reached, keeping partial results"
                    );
                    outcome.errors.push(SourceError::new(
                        collector.platform(),
                        ErrorKind::DeadlineExceeded,
                        format!("{} did not finish before the run deadline", collector.name()),
                    ));
                    break;
                }
            },
            None => pages.next().await,
        };

        match next {
            Some(Ok(page)) => {
                outcome.malformed += page.malformed;
                outcome.records.extend(page.records);
            }
            Some(Err(err)) => {
                tracing::warn!(source = %collector.name(), error = %err, "source failed");
                outcome.errors.push(source_error(collector.platform(), &err));
                break;
            }
            None => break,
        }
    }

    if outcome.malformed > 0 {
        // A source that stopped early already has its one error entry.
        let note = format!("{} item(s) could not be parsed", outcome.malformed);
        match outcome.errors.last_mut() {
            Some(failure) => failure.reason = format!("{}; {note}", failure.reason),
            None => outcome.errors.push(SourceError::new(
                collector.platform(),
                ErrorKind::MalformedRecord,
                format!("{}: {note}", collector.name()),
            )),
        }
    }
    outcome
}

/// Merge per-source outcomes into one ordered, deduplicated run. Counters
/// already on `run` are added to, not replaced.
pub(crate) fn merge(
    mut run: PipelineRun<RawRecord>,
    outcomes: Vec<SourceOutcome>,
) -> PipelineRun<RawRecord> {
    let mut merged = Vec::new();

    for outcome in outcomes {
        run.observed += outcome.records.len() + outcome.malformed;
        run.drops.malformed += outcome.malformed;
        run.errors.extend(outcome.errors);
        merged.extend(outcome.records);
    }

    let before_window = merged.len();
    merged.retain(|r| r.timestamp >= run.since && r.timestamp <= run.until);
    run.drops.out_of_window += before_window - merged.len();

    // Stable: equal keys keep arrival order.
    merged.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.platform.as_str().cmp(b.platform.as_str()))
    });

    let before_dedup = merged.len();
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(merged.len());
    for record in merged {
        if seen.insert(dedup_key_owned(&record)) {
            records.push(record);
        }
    }
    run.drops.duplicates += before_dedup - records.len();

    run.records = records;
    run
}

fn dedup_key_owned(record: &RawRecord) -> (Platform, String, i64) {
    let (platform, text, second) = record.dedup_key();
    (platform, text.to_string(), second)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64, millis: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, millis * 1_000_000)
            .unwrap()
    }

    fn record(platform: Platform, text: &str, ts: DateTime<Utc>) -> RawRecord {
        RawRecord {
            source_id: format!("{platform}-{text}"),
            platform,
            timestamp: ts,
            raw_text: text.to_string(),
            region_hint: None,
            likes: None,
            shares: None,
        }
    }

    fn base_run() -> PipelineRun<RawRecord> {
        PipelineRun::new("q", at(0, 0), at(100, 0))
    }

    #[test]
    fn merge_orders_by_timestamp_then_platform() {
        let outcomes = vec![
            SourceOutcome {
                records: vec![record(Platform::Video, "v", at(5, 0))],
                ..SourceOutcome::default()
            },
            SourceOutcome {
                records: vec![
                    record(Platform::Forum, "f", at(5, 0)),
                    record(Platform::Forum, "early", at(1, 0)),
                ],
                ..SourceOutcome::default()
            },
        ];
        let run = merge(base_run(), outcomes);
        let texts: Vec<&str> = run.records.iter().map(|r| r.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["early", "f", "v"]);
    }

    #[test]
    fn merge_collapses_same_text_within_rounded_second() {
        let outcomes = vec![SourceOutcome {
            records: vec![
                record(Platform::Feed, "same", at(10, 100)),
                record(Platform::Feed, "same", at(9, 700)),
                record(Platform::Forum, "same", at(10, 0)),
            ],
            ..SourceOutcome::default()
        }];
        let run = merge(base_run(), outcomes);
        assert_eq!(run.records.len(), 2);
        assert_eq!(run.drops.duplicates, 1);
        assert_eq!(run.observed, 3);
    }

    #[test]
    fn merge_drops_records_outside_window() {
        let outcomes = vec![SourceOutcome {
            records: vec![
                record(Platform::Feed, "before", at(-1, 0)),
                record(Platform::Feed, "start", at(0, 0)),
                record(Platform::Feed, "end", at(100, 0)),
                record(Platform::Feed, "after", at(101, 0)),
            ],
            malformed: 2,
            errors: Vec::new(),
        }];
        let run = merge(base_run(), outcomes);
        assert_eq!(run.records.len(), 2);
        assert_eq!(run.drops.out_of_window, 2);
        assert_eq!(run.drops.malformed, 2);
        assert_eq!(run.observed, 6);
        assert_eq!(run.records.len() + run.drops.total(), run.observed);
    }

    #[test]
    fn rate_limit_maps_to_its_own_kind() {
        let err = SentimentError::RateLimited {
            platform: Platform::Feed,
            retry_after_secs: 60,
        };
        assert_eq!(source_error(Platform::Feed, &err).kind, ErrorKind::RateLimited);

        let err = SentimentError::Worker("boom".to_string());
        assert_eq!(
            source_error(Platform::Forum, &err).kind,
            ErrorKind::SourceUnavailable
        );
    }
}
