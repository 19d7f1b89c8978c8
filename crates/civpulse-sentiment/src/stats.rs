//! Run-level summary statistics over classified records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{ClassifiedRecord, DropCounts, PipelineRun, SentimentLabel};

/// A group label with its mean polarity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLabel {
    pub label: String,
    pub mean_polarity: f64,
}

/// Headline comparisons by mean polarity. Ties go to the label that sorts
/// first; every field is `None` for an empty dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    pub most_positive_policy: Option<RankedLabel>,
    pub most_criticised_policy: Option<RankedLabel>,
    pub most_positive_region: Option<RankedLabel>,
    pub most_positive_platform: Option<RankedLabel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub total: usize,
    /// Always carries all three labels, zero counts included.
    pub per_sentiment_counts: BTreeMap<String, usize>,
    pub per_policy_counts: BTreeMap<String, usize>,
    pub per_region_counts: BTreeMap<String, usize>,
    pub per_platform_counts: BTreeMap<String, usize>,
    pub error_count: usize,
    pub observed: usize,
    pub drops: DropCounts,
    pub low_confidence: usize,
    pub mean_polarity: f64,
    pub total_likes: u64,
    pub total_shares: u64,
    /// `YYYY-MM` → sentiment label → count.
    pub monthly: BTreeMap<String, BTreeMap<String, usize>>,
    pub insights: Insights,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

fn sentiment_buckets() -> BTreeMap<String, usize> {
    SentimentLabel::ALL
        .iter()
        .map(|label| (label.as_str().to_string(), 0))
        .collect()
}

/// Pick the best group by `better(candidate, current)`; iteration is in
/// label order so the first label wins ties.
fn pick(groups: &BTreeMap<String, Mean>, better: impl Fn(f64, f64) -> bool) -> Option<RankedLabel> {
    let mut best: Option<RankedLabel> = None;
    for (label, mean) in groups {
        let value = mean.value();
        if best.as_ref().is_none_or(|b| better(value, b.mean_polarity)) {
            best = Some(RankedLabel {
                label: label.clone(),
                mean_polarity: value,
            });
        }
    }
    best
}

impl RunStats {
    /// Summarize a classified run.
    ///
    /// Every per-group map sums to `total`, and
    /// `total + drops.total() == observed`.
    #[must_use]
    pub fn from_run(run: &PipelineRun<ClassifiedRecord>) -> Self {
        let mut stats = Self {
            total: run.records.len(),
            per_sentiment_counts: sentiment_buckets(),
            error_count: run.errors.len(),
            observed: run.observed,
            drops: run.drops,
            ..Self::default()
        };

        let mut overall = Mean::default();
        let mut by_policy: BTreeMap<String, Mean> = BTreeMap::new();
        let mut by_region: BTreeMap<String, Mean> = BTreeMap::new();
        let mut by_platform: BTreeMap<String, Mean> = BTreeMap::new();

        for record in &run.records {
            let label = record.sentiment_label.as_str().to_string();
            *stats.per_sentiment_counts.entry(label.clone()).or_default() += 1;
            *stats.per_policy_counts.entry(record.policy_label.clone()).or_default() += 1;
            *stats.per_region_counts.entry(record.region_label.clone()).or_default() += 1;
            *stats
                .per_platform_counts
                .entry(record.platform().as_str().to_string())
                .or_default() += 1;

            let month = record.timestamp().format("%Y-%m").to_string();
            *stats
                .monthly
                .entry(month)
                .or_insert_with(sentiment_buckets)
                .entry(label)
                .or_default() += 1;

            if record.normalized.low_confidence {
                stats.low_confidence += 1;
            }
            stats.total_likes = stats
                .total_likes
                .saturating_add(record.normalized.raw.likes.unwrap_or(0));
            stats.total_shares = stats
                .total_shares
                .saturating_add(record.normalized.raw.shares.unwrap_or(0));

            overall.add(record.polarity);
            by_policy
                .entry(record.policy_label.clone())
                .or_default()
                .add(record.polarity);
            by_region
                .entry(record.region_label.clone())
                .or_default()
                .add(record.polarity);
            by_platform
                .entry(record.platform().as_str().to_string())
                .or_default()
                .add(record.polarity);
        }

        stats.mean_polarity = overall.value();
        stats.insights = Insights {
            most_positive_policy: pick(&by_policy, |a, b| a > b),
            most_criticised_policy: pick(&by_policy, |a, b| a < b),
            most_positive_region: pick(&by_region, |a, b| a > b),
            most_positive_platform: pick(&by_platform, |a, b| a > b),
        };
        stats
    }

    /// Share of records with `label`, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self, label: SentimentLabel) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = self.per_sentiment_counts.get(label.as_str()).copied().unwrap_or(0);
        count as f64 * 100.0 / self.total as f64
    }
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
