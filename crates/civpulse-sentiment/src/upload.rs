//! Tabular (CSV) upload as an alternative record source.
//!
//! Expected columns: `date`, `text`, `platform`, and optionally `region`,
//! `likes`, `shares`. Column order does not matter and unknown columns are
//! ignored. Rows with a bad date, missing text or unknown platform are
//! dropped and reported; they never fail the upload.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::SentimentError;
use crate::types::{Platform, RawRecord, SourceError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UploadRow {
    date: Option<String>,
    text: Option<String>,
    platform: Option<String>,
    region: Option<String>,
    likes: Option<String>,
    shares: Option<String>,
}

/// Parsed upload: valid records plus one error per rejected row.
#[derive(Debug, Default)]
pub struct UploadBatch {
    pub records: Vec<RawRecord>,
    pub errors: Vec<SourceError>,
    /// Data rows read, valid or not.
    pub rows: usize,
}

impl UploadBatch {
    #[must_use]
    pub fn invalid_rows(&self) -> usize {
        self.errors.len()
    }
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]`, ISO-8601 without offset,
/// or RFC 3339. Values without an offset are taken as UTC.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_count(value: Option<&str>) -> Option<u64> {
    let value = value?.trim();
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0).map(to_count))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> u64 {
    value.round() as u64
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn row_to_record(line: u64, row: UploadRow) -> Result<RawRecord, SourceError> {
    let platform_name = non_blank(row.platform);
    let platform = platform_name.as_deref().and_then(Platform::from_alias);

    let Some(text) = non_blank(row.text) else {
        return Err(SourceError::invalid_row(line, platform, "missing text"));
    };
    let Some(timestamp) = row.date.as_deref().and_then(parse_date) else {
        return Err(SourceError::invalid_row(
            line,
            platform,
            &format!("unparseable date {:?}", row.date.unwrap_or_default()),
        ));
    };
    let Some(platform) = platform else {
        return Err(SourceError::invalid_row(
            line,
            None,
            &format!("unknown platform {:?}", platform_name.unwrap_or_default()),
        ));
    };

    Ok(RawRecord {
        source_id: format!("upload-{line}"),
        platform,
        timestamp,
        raw_text: text,
        region_hint: non_blank(row.region).map(|r| r.trim().to_string()),
        likes: parse_count(row.likes.as_deref()),
        shares: parse_count(row.shares.as_deref()),
    })
}

/// Read an upload from any reader.
///
/// # Errors
///
/// Returns [`SentimentError::Upload`] only when the header row cannot be
/// read. Problems in data rows are reported in [`UploadBatch::errors`].
pub fn read_upload<R: Read>(reader: R) -> Result<UploadBatch, SentimentError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut batch = UploadBatch::default();
    for result in csv_reader.records() {
        batch.rows += 1;
        match result {
            Ok(record) => {
                let line = record.position().map_or(0, csv::Position::line);
                let parsed = record
                    .deserialize::<UploadRow>(Some(&headers))
                    .map_err(|e| SourceError::invalid_row(line, None, &e.to_string()))
                    .and_then(|row| row_to_record(line, row));
                match parsed {
                    Ok(raw) => batch.records.push(raw),
                    Err(err) => batch.errors.push(err),
                }
            }
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                batch
                    .errors
                    .push(SourceError::invalid_row(line, None, &e.to_string()));
            }
        }
    }

    tracing::debug!(
        rows = batch.rows,
        records = batch.records.len(),
        invalid = batch.invalid_rows(),
        "parsed upload"
    );
    Ok(batch)
}

/// Read an upload from a CSV file.
///
/// # Errors
///
/// Returns [`SentimentError::Upload`] if the file cannot be opened or its
/// header row cannot be read.
pub fn read_upload_file(path: &Path) -> Result<UploadBatch, SentimentError> {
    let file = File::open(path).map_err(csv::Error::from)?;
    read_upload(file)
}
