//! Policy/region keyword tables and scorer lexicon additions.
//!
//! Declared order matters: when two labels match the same number of keywords,
//! the one listed first wins.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One categorical label and the keyword strings that vote for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Extra word weight for the lexical polarity scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub word: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub policies: Vec<KeywordGroup>,
    pub regions: Vec<KeywordGroup>,
    #[serde(default)]
    pub lexicon: Vec<LexiconEntry>,
}

fn group(label: &str, keywords: &[&str]) -> KeywordGroup {
    KeywordGroup {
        label: label.to_string(),
        keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
    }
}

impl Taxonomy {
    /// Taxonomy used when no file is configured: five national policy
    /// initiatives and twelve major cities.
    #[must_use]
    pub fn builtin() -> Self {
        let policies = vec![
            group(
                "Digital India",
                &[
                    "digital india",
                    "digitalindia",
                    "digitization",
                    "digitalization",
                    "e-governance",
                    "digital payment",
                    "upi",
                ],
            ),
            group(
                "Swachh Bharat",
                &[
                    "swachh bharat",
                    "clean india",
                    "cleanliness",
                    "toilet construction",
                    "swachh mission",
                ],
            ),
            group(
                "Make in India",
                &[
                    "make in india",
                    "makeinindia",
                    "manufacturing",
                    "atmanirbhar",
                    "self reliant",
                ],
            ),
            group(
                "Jan Dhan Yojana",
                &["jan dhan", "bank account", "financial inclusion"],
            ),
            group(
                "Ayushman Bharat",
                &[
                    "ayushman bharat",
                    "healthcare",
                    "health insurance",
                    "pmjay",
                ],
            ),
        ];

        let regions = vec![
            group("Mumbai", &["mumbai", "bombay"]),
            group("Delhi", &["delhi"]),
            group("Bangalore", &["bangalore", "bengaluru"]),
            group("Chennai", &["chennai", "madras"]),
            group("Kolkata", &["kolkata", "calcutta"]),
            group("Hyderabad", &["hyderabad"]),
            group("Pune", &["pune"]),
            group("Ahmedabad", &["ahmedabad"]),
            group("Jaipur", &["jaipur"]),
            group("Lucknow", &["lucknow"]),
            group("Kanpur", &["kanpur"]),
            group("Nagpur", &["nagpur"]),
        ];

        Self {
            policies,
            regions,
            lexicon: Vec::new(),
        }
    }

    /// Check the tables are usable for mandatory categorization.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if either table is empty, a label
    /// or keyword is blank, a label is duplicated (case-insensitive), or a
    /// lexicon weight lies outside `[-1.0, 1.0]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_groups("policies", &self.policies)?;
        validate_groups("regions", &self.regions)?;

        for entry in &self.lexicon {
            if entry.word.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "lexicon word must be non-empty".to_string(),
                ));
            }
            if !(-1.0..=1.0).contains(&entry.weight) {
                return Err(ConfigError::Validation(format!(
                    "lexicon word '{}' has weight {} outside [-1.0, 1.0]",
                    entry.word, entry.weight
                )));
            }
        }

        Ok(())
    }
}

fn validate_groups(table: &str, groups: &[KeywordGroup]) -> Result<(), ConfigError> {
    if groups.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{table} table must declare at least one label"
        )));
    }

    let mut seen_labels = HashSet::new();
    for group in groups {
        if group.label.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{table} label must be non-empty"
            )));
        }
        if !seen_labels.insert(group.label.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {table} label: '{}'",
                group.label
            )));
        }
        if group.keywords.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{table} label '{}' has no keywords",
                group.label
            )));
        }
        if group.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{table} label '{}' has a blank keyword",
                group.label
            )));
        }
    }

    Ok(())
}

/// Load and validate a taxonomy from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_taxonomy(path: &Path) -> Result<Taxonomy, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TaxonomyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_taxonomy(&content)
}

/// Parse and validate taxonomy YAML held in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML does not parse or fails validation.
pub fn parse_taxonomy(yaml: &str) -> Result<Taxonomy, ConfigError> {
    let taxonomy: Taxonomy = serde_yaml::from_str(yaml)?;
    taxonomy.validate()?;
    Ok(taxonomy)
}

/// Search queries to run when collecting posts about `policy`.
///
/// Known policies expand to their lower-cased label followed by their
/// keywords, de-duplicated in order. Unknown names search for themselves.
#[must_use]
pub fn queries_for_policy(taxonomy: &Taxonomy, policy: &str) -> Vec<String> {
    let wanted = policy.trim().to_lowercase();
    let Some(group) = taxonomy
        .policies
        .iter()
        .find(|g| g.label.trim().to_lowercase() == wanted)
    else {
        return vec![wanted];
    };

    let mut seen = HashSet::new();
    std::iter::once(group.label.to_lowercase())
        .chain(group.keywords.iter().map(|k| k.trim().to_lowercase()))
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

#[cfg(test)]
#[path = "taxonomy_test.rs"]
mod tests;
