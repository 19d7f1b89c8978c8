use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Source platform a record was collected from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Feed,
    Forum,
    Video,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Feed => "feed",
            Platform::Forum => "forum",
            Platform::Video => "video",
        }
    }

    /// Map a free-form platform name (as found in uploaded tables) to a
    /// platform, case-insensitively.
    #[must_use]
    pub fn from_alias(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "feed" | "twitter" | "x" => Some(Platform::Feed),
            "forum" | "reddit" => Some(Platform::Forum),
            "video" | "youtube" => Some(Platform::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as produced by a collector or an uploaded table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    /// Platform-native id (tweet id, post id, comment id, upload line).
    pub source_id: String,
    pub platform: Platform,
    pub timestamp: DateTime<Utc>,
    pub raw_text: String,
    pub region_hint: Option<String>,
    pub likes: Option<u64>,
    pub shares: Option<u64>,
}

impl RawRecord {
    /// Timestamp rounded half-up to the whole second.
    #[must_use]
    pub fn rounded_second(&self) -> i64 {
        self.timestamp
            .timestamp_millis()
            .saturating_add(500)
            .div_euclid(1000)
    }

    /// Identity used for deduplication: `(platform, raw_text, rounded second)`.
    #[must_use]
    pub fn dedup_key(&self) -> (Platform, &str, i64) {
        (self.platform, self.raw_text.as_str(), self.rounded_second())
    }

    /// Stable hex id derived from the dedup key.
    #[must_use]
    pub fn record_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.raw_text.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.rounded_second().to_be_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A raw record plus its cleaned text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    #[serde(flatten)]
    pub raw: RawRecord,
    pub clean_text: String,
    /// Set when normalization left nothing to analyse.
    pub low_confidence: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal, fully classified record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    pub record_id: String,
    #[serde(flatten)]
    pub normalized: NormalizedRecord,
    /// Lexical polarity in `[-1.0, 1.0]`.
    pub polarity: f64,
    pub sentiment_label: SentimentLabel,
    pub policy_label: String,
    pub region_label: String,
}

impl ClassifiedRecord {
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.normalized.raw.platform
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.normalized.raw.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    SourceUnavailable,
    MalformedRecord,
    InvalidUploadRow,
    DeadlineExceeded,
}

/// A non-fatal problem captured during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceError {
    /// `None` for upload rows whose platform could not be determined.
    pub platform: Option<Platform>,
    pub kind: ErrorKind,
    pub reason: String,
}

impl SourceError {
    #[must_use]
    pub fn new(platform: Platform, kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            platform: Some(platform),
            kind,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_row(line: u64, platform: Option<Platform>, reason: &str) -> Self {
        Self {
            platform,
            kind: ErrorKind::InvalidUploadRow,
            reason: format!("line {line}: {reason}"),
        }
    }
}

/// Records discarded between observation and the final dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    /// Platform items that could not be translated into a record.
    pub malformed: usize,
    /// Uploaded rows with a bad date, text or platform.
    pub invalid_rows: usize,
    pub duplicates: usize,
    pub out_of_window: usize,
}

impl DropCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.malformed + self.invalid_rows + self.duplicates + self.out_of_window
    }
}

/// One pipeline invocation. `R` is [`RawRecord`] after aggregation and
/// [`ClassifiedRecord`] after classification.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun<R> {
    pub run_id: Uuid,
    pub query: String,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub records: Vec<R>,
    pub errors: Vec<SourceError>,
    /// Every item seen, including ones later dropped.
    pub observed: usize,
    pub drops: DropCounts,
}

impl<R> PipelineRun<R> {
    #[must_use]
    pub fn new(query: &str, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.to_string(),
            since,
            until,
            records: Vec::new(),
            errors: Vec::new(),
            observed: 0,
            drops: DropCounts::default(),
        }
    }

    /// Replace the records, keeping run metadata and error accounting.
    #[must_use]
    pub fn with_records<T>(self, records: Vec<T>) -> PipelineRun<T> {
        PipelineRun {
            run_id: self.run_id,
            query: self.query,
            since: self.since,
            until: self.until,
            records,
            errors: self.errors,
            observed: self.observed,
            drops: self.drops,
        }
    }
}

/// What a collector is asked to fetch.
#[derive(Debug, Clone)]
pub struct CollectQuery {
    pub query: String,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    /// Items requested per page.
    pub page_size: u32,
    /// Upper bound on pages fetched per source.
    pub max_pages: usize,
}
