//! Pipeline orchestration: aggregate, then normalize, score and categorize
//! every record, then summarize.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use civpulse_core::{AppConfig, ConfigError, Taxonomy};
use serde::Serialize;

use crate::aggregator::{merge, Aggregator, PageLimits, SourceOutcome};
use crate::categorize::Categorizer;
use crate::error::SentimentError;
use crate::normalize::normalize;
use crate::scorer::SentimentScorer;
use crate::sources::SourceCollector;
use crate::stats::RunStats;
use crate::types::{ClassifiedRecord, NormalizedRecord, PipelineRun, RawRecord};
use crate::upload::UploadBatch;

/// The per-record transformation: normalize → score → categorize.
///
/// Holds only immutable tables, so one instance is shared by every worker.
#[derive(Debug, Clone)]
pub struct RecordClassifier {
    scorer: SentimentScorer,
    categorizer: Categorizer,
}

impl RecordClassifier {
    /// Classifier using the default lexicon extended by the taxonomy's
    /// lexicon entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the taxonomy is unusable.
    pub fn new(taxonomy: &Taxonomy) -> Result<Self, ConfigError> {
        Ok(Self {
            scorer: SentimentScorer::with_lexicon(&taxonomy.lexicon),
            categorizer: Categorizer::new(taxonomy)?,
        })
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: SentimentScorer) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn classify(&self, raw: RawRecord) -> ClassifiedRecord {
        let clean_text = normalize(&raw.raw_text);
        let (polarity, sentiment_label) = self.scorer.score(&clean_text);
        let (policy_label, region_label) = self
            .categorizer
            .categorize(&clean_text, raw.region_hint.as_deref());

        ClassifiedRecord {
            record_id: raw.record_id(),
            normalized: NormalizedRecord {
                low_confidence: clean_text.is_empty(),
                clean_text,
                raw,
            },
            polarity,
            sentiment_label,
            policy_label,
            region_label,
        }
    }
}

/// Final dataset plus its summary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run: PipelineRun<ClassifiedRecord>,
    pub stats: RunStats,
}

pub struct Pipeline {
    aggregator: Aggregator,
    classifier: Arc<RecordClassifier>,
    workers: usize,
}

impl Pipeline {
    #[must_use]
    pub fn new(aggregator: Aggregator, classifier: RecordClassifier, workers: usize) -> Self {
        Self {
            aggregator,
            classifier: Arc::new(classifier),
            workers: workers.max(1),
        }
    }

    /// Wire a pipeline from application settings.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Config`] if the taxonomy is unusable.
    pub fn from_config(
        config: &AppConfig,
        taxonomy: &Taxonomy,
        collectors: Vec<Arc<dyn SourceCollector>>,
    ) -> Result<Self, SentimentError> {
        let aggregator = Aggregator::new(
            collectors,
            config.max_concurrent_sources,
            config.run_deadline_secs.map(Duration::from_secs),
        )
        .with_limits(PageLimits {
            page_size: config.page_size,
            max_pages: config.max_pages,
        });
        let classifier = RecordClassifier::new(taxonomy)?;
        Ok(Self::new(aggregator, classifier, config.classify_workers))
    }

    /// Collect `query` over `[since, until]` and classify the result.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Worker`] if a classification worker panics.
    /// Source failures are reported in the run's `errors` instead.
    pub async fn process(
        &self,
        query: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<PipelineOutcome, SentimentError> {
        let run = self.aggregator.run(query, since, until).await;
        self.classify_run(run).await
    }

    /// Like [`Self::process`] for several queries merged into one dataset.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Worker`] if a classification worker panics.
    pub async fn process_queries(
        &self,
        queries: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<PipelineOutcome, SentimentError> {
        let run = self.aggregator.run_many(queries, since, until).await;
        self.classify_run(run).await
    }

    /// Classify an uploaded table. The run window spans the valid rows.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Worker`] if a classification worker panics.
    pub async fn process_upload(
        &self,
        name: &str,
        batch: UploadBatch,
    ) -> Result<PipelineOutcome, SentimentError> {
        let since = batch.records.iter().map(|r| r.timestamp).min();
        let until = batch.records.iter().map(|r| r.timestamp).max();
        let now = Utc::now();

        let mut run = PipelineRun::new(name, since.unwrap_or(now), until.unwrap_or(now));
        run.observed = batch.invalid_rows();
        run.drops.invalid_rows = batch.invalid_rows();
        run.errors = batch.errors;

        let run = merge(
            run,
            vec![SourceOutcome {
                records: batch.records,
                ..SourceOutcome::default()
            }],
        );
        self.classify_run(run).await
    }

    /// Classify an aggregated run and compute its statistics.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Worker`] if a classification worker panics.
    pub async fn classify_run(
        &self,
        mut run: PipelineRun<RawRecord>,
    ) -> Result<PipelineOutcome, SentimentError> {
        let raw = std::mem::take(&mut run.records);
        let classified = classify_parallel(Arc::clone(&self.classifier), raw, self.workers).await?;
        let run = run.with_records(classified);
        let stats = RunStats::from_run(&run);

        tracing::info!(
            run_id = %run.run_id,
            query = %run.query,
            total = stats.total,
            observed = stats.observed,
            dropped = stats.drops.total(),
            errors = stats.error_count,
            low_confidence = stats.low_confidence,
            "pipeline run complete"
        );
        Ok(PipelineOutcome { run, stats })
    }
}

/// Classify records on blocking worker threads, preserving input order.
async fn classify_parallel(
    classifier: Arc<RecordClassifier>,
    records: Vec<RawRecord>,
    workers: usize,
) -> Result<Vec<ClassifiedRecord>, SentimentError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = records.len().div_ceil(workers.max(1));
    let mut handles = Vec::new();
    let mut remaining = records;
    while !remaining.is_empty() {
        let rest = remaining.split_off(chunk_size.min(remaining.len()));
        let chunk = std::mem::replace(&mut remaining, rest);
        let classifier = Arc::clone(&classifier);
        handles.push(tokio::task::spawn_blocking(move || {
            chunk
                .into_iter()
                .map(|raw| classifier.classify(raw))
                .collect::<Vec<_>>()
        }));
    }

    let mut classified = Vec::new();
    for handle in handles {
        let chunk = handle
            .await
            .map_err(|e| SentimentError::Worker(e.to_string()))?;
        classified.extend(chunk);
    }
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::{Platform, SentimentLabel};

    fn raw(text: &str, secs: i64) -> RawRecord {
        RawRecord {
            source_id: secs.to_string(),
            platform: Platform::Feed,
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            raw_text: text.to_string(),
            region_hint: Some("Chennai".to_string()),
            likes: None,
            shares: None,
        }
    }

    #[test]
    fn classifies_example_post() {
        let classifier = RecordClassifier::new(&Taxonomy::builtin()).unwrap();
        let record = classifier.classify(raw(
            "Digital India is amazing for rural banking! #DigitalIndia",
            0,
        ));
        assert!(!record.normalized.clean_text.contains('#'));
        assert!(record.polarity > 0.1);
        assert_eq!(record.sentiment_label, SentimentLabel::Positive);
        assert_eq!(record.policy_label, "Digital India");
        assert_eq!(record.region_label, "Chennai");
        assert!(!record.normalized.low_confidence);
    }

    #[test]
    fn empty_text_is_low_confidence_and_uncategorized() {
        let classifier = RecordClassifier::new(&Taxonomy::builtin()).unwrap();
        let mut input = raw("", 0);
        input.region_hint = None;
        let record = classifier.classify(input);
        assert_eq!(record.normalized.clean_text, "");
        assert_eq!(record.polarity, 0.0);
        assert_eq!(record.sentiment_label, SentimentLabel::Neutral);
        assert_eq!(record.policy_label, "Uncategorized");
        assert_eq!(record.region_label, "Unknown");
        assert!(record.normalized.low_confidence);
    }

    #[tokio::test]
    async fn parallel_classification_preserves_order() {
        let classifier = Arc::new(RecordClassifier::new(&Taxonomy::builtin()).unwrap());
        let records: Vec<RawRecord> = (0..37).map(|i| raw(&format!("post {i}"), i)).collect();
        let ids: Vec<String> = records.iter().map(|r| r.source_id.clone()).collect();

        let classified = classify_parallel(classifier, records, 4).await.unwrap();
        let out: Vec<String> = classified
            .iter()
            .map(|r| r.normalized.raw.source_id.clone())
            .collect();
        assert_eq!(out, ids);
    }
}
