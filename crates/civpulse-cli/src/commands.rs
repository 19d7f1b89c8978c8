//! Command handlers. Each builds a pipeline and returns its outcome.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use civpulse_core::{queries_for_policy, AppConfig, Taxonomy};
use civpulse_sentiment::{
    build_collectors, demo_collectors, read_upload_file, Pipeline, PipelineOutcome,
};

/// `(now - days, now)`.
///
/// # Errors
///
/// Returns an error if `days` is not positive.
pub(crate) fn window_ending_now(days: i64) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    if days <= 0 {
        anyhow::bail!("--days must be positive, got {days}");
    }
    let until = Utc::now();
    let since = until
        .checked_sub_signed(Duration::days(days))
        .ok_or_else(|| anyhow::anyhow!("--days {days} is out of range"))?;
    Ok((since, until))
}

fn live_pipeline(config: &AppConfig, taxonomy: &Taxonomy) -> anyhow::Result<Pipeline> {
    let collectors = build_collectors(config)?;
    if collectors.is_empty() {
        anyhow::bail!(
            "no sources configured; set FEED_BEARER_TOKEN, FORUM_SUBREDDITS or \
             VIDEO_API_KEY with VIDEO_IDS, or try `civpulse demo`"
        );
    }
    Ok(Pipeline::from_config(config, taxonomy, collectors)?)
}

pub(crate) async fn run_query(
    config: &AppConfig,
    taxonomy: &Taxonomy,
    query: &str,
    days: i64,
) -> anyhow::Result<PipelineOutcome> {
    let (since, until) = window_ending_now(days)?;
    let pipeline = live_pipeline(config, taxonomy)?;
    Ok(pipeline.process(query, since, until).await?)
}

pub(crate) async fn run_policy(
    config: &AppConfig,
    taxonomy: &Taxonomy,
    policy: &str,
    days: i64,
) -> anyhow::Result<PipelineOutcome> {
    let (since, until) = window_ending_now(days)?;
    let queries = queries_for_policy(taxonomy, policy);
    tracing::info!(policy, queries = queries.len(), "collecting policy queries");

    let pipeline = live_pipeline(config, taxonomy)?;
    Ok(pipeline.process_queries(&queries, since, until).await?)
}

pub(crate) async fn run_demo(
    config: &AppConfig,
    taxonomy: &Taxonomy,
    posts: usize,
    seed: u64,
    days: i64,
) -> anyhow::Result<PipelineOutcome> {
    let (since, until) = window_ending_now(days)?;
    let pipeline = Pipeline::from_config(config, taxonomy, demo_collectors(posts, seed))?;
    Ok(pipeline.process("demo", since, until).await?)
}

pub(crate) async fn run_upload(
    config: &AppConfig,
    taxonomy: &Taxonomy,
    path: &Path,
) -> anyhow::Result<PipelineOutcome> {
    let batch = read_upload_file(path)?;
    let pipeline = Pipeline::from_config(config, taxonomy, Vec::new())?;
    let name = format!("upload:{}", path.display());
    Ok(pipeline.process_upload(&name, batch).await?)
}
