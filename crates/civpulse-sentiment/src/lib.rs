//! Policy-sentiment ingestion pipeline.
//!
//! Collects posts and comments from a social feed, a forum and a video
//! platform (or an uploaded CSV), cleans the text, scores its polarity with
//! a lexicon, tags each record with a policy and a region, and summarizes
//! the run. Source failures are isolated per source and reported alongside
//! whatever data was gathered.

pub mod aggregator;
pub mod categorize;
pub mod client;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod quota;
pub mod scorer;
pub mod sources;
pub mod stats;
pub mod types;
pub mod upload;

pub use aggregator::{Aggregator, PageLimits};
pub use categorize::{Categorizer, UNCATEGORIZED, UNKNOWN_REGION};
pub use client::{FetchRequest, RateLimitedClient, RetryPolicy};
pub use error::SentimentError;
pub use normalize::normalize;
pub use pipeline::{Pipeline, PipelineOutcome, RecordClassifier};
pub use quota::SourceQuota;
pub use scorer::{classify, LexiconModel, PolarityModel, SentimentScorer};
pub use sources::{
    build_collectors, demo_collectors, DemoCollector, FeedCollector, ForumCollector, Page,
    SourceCollector, VideoCollector,
};
pub use stats::{Insights, RankedLabel, RunStats};
pub use types::{
    ClassifiedRecord, CollectQuery, DropCounts, ErrorKind, NormalizedRecord, PipelineRun,
    Platform, RawRecord, SentimentLabel, SourceError,
};
pub use upload::{read_upload, read_upload_file, UploadBatch};
