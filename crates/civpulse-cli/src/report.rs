//! Human-readable and JSON rendering of a pipeline outcome.

use std::collections::BTreeMap;

use civpulse_sentiment::{PipelineOutcome, RankedLabel, SentimentLabel};

pub(crate) fn to_json(outcome: &PipelineOutcome) -> anyhow::Result<String> {
    let value = serde_json::json!({
        "run_id": outcome.run.run_id,
        "query": outcome.run.query,
        "since": outcome.run.since,
        "until": outcome.run.until,
        "records": outcome.run.records,
        "errors": outcome.run.errors,
        "stats": outcome.stats,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn ranked(label: &str, value: Option<&RankedLabel>) -> String {
    match value {
        Some(r) => format!("{label}: {} (avg polarity {:.3})", r.label, r.mean_polarity),
        None => format!("{label}: n/a"),
    }
}

fn print_counts(title: &str, counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    println!();
    println!("{title}");
    let mut rows: Vec<(&String, &usize)> = counts.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (label, count) in rows {
        println!("  {label:<22}{count:>6}");
    }
}

pub(crate) fn print_summary(outcome: &PipelineOutcome) {
    let stats = &outcome.stats;
    let run = &outcome.run;

    println!("run {} query={:?}", run.run_id, run.query);
    println!(
        "window {} .. {}",
        run.since.format("%Y-%m-%d %H:%M"),
        run.until.format("%Y-%m-%d %H:%M")
    );
    println!(
        "records {} (observed {}, malformed {}, invalid rows {}, duplicates {}, out of window {})",
        stats.total,
        stats.observed,
        stats.drops.malformed,
        stats.drops.invalid_rows,
        stats.drops.duplicates,
        stats.drops.out_of_window
    );
    println!(
        "positive {:.1}%  neutral {:.1}%  negative {:.1}%  mean polarity {:.3}",
        stats.percent(SentimentLabel::Positive),
        stats.percent(SentimentLabel::Neutral),
        stats.percent(SentimentLabel::Negative),
        stats.mean_polarity
    );
    println!(
        "engagement: {} likes, {} shares; {} low-confidence records",
        stats.total_likes, stats.total_shares, stats.low_confidence
    );

    print_counts("by policy", &stats.per_policy_counts);
    print_counts("by region", &stats.per_region_counts);
    print_counts("by platform", &stats.per_platform_counts);

    if !stats.monthly.is_empty() {
        println!();
        println!("{:<10}{:>10}{:>10}{:>10}", "MONTH", "POSITIVE", "NEUTRAL", "NEGATIVE");
        for (month, counts) in &stats.monthly {
            let get = |label: SentimentLabel| counts.get(label.as_str()).copied().unwrap_or(0);
            println!(
                "{month:<10}{:>10}{:>10}{:>10}",
                get(SentimentLabel::Positive),
                get(SentimentLabel::Neutral),
                get(SentimentLabel::Negative)
            );
        }
    }

    if stats.total > 0 {
        let insights = &stats.insights;
        println!();
        println!("{}", ranked("most positive policy", insights.most_positive_policy.as_ref()));
        println!("{}", ranked("most criticised policy", insights.most_criticised_policy.as_ref()));
        println!("{}", ranked("most positive region", insights.most_positive_region.as_ref()));
        println!("{}", ranked("most positive platform", insights.most_positive_platform.as_ref()));
    }

    if !run.errors.is_empty() {
        println!();
        println!("{} error(s):", run.errors.len());
        for err in &run.errors {
            let platform = err.platform.map_or("-", |p| p.as_str());
            println!("  [{platform}] {:?}: {}", err.kind, err.reason);
        }
    }
}
