//! Keyword-table policy and region tagging.

use civpulse_core::{ConfigError, KeywordGroup, Taxonomy};

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNKNOWN_REGION: &str = "Unknown";

/// Lower-cased keyword table in declared (priority) order.
#[derive(Debug, Clone)]
struct KeywordTable {
    groups: Vec<(String, Vec<String>)>,
}

impl KeywordTable {
    fn new(groups: &[KeywordGroup]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|g| {
                    let keywords = g
                        .keywords
                        .iter()
                        .map(|k| k.trim().to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                    (g.label.clone(), keywords)
                })
                .collect(),
        }
    }

    /// Label with the most keyword occurrences in `text`; the first declared
    /// label wins ties. `None` when nothing matches.
    fn best_match(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        let mut best: Option<(&str, usize)> = None;

        for (label, keywords) in &self.groups {
            let count: usize = keywords.iter().map(|k| text.matches(k.as_str()).count()).sum();
            if count > 0 && best.is_none_or(|(_, top)| count > top) {
                best = Some((label.as_str(), count));
            }
        }

        best.map(|(label, _)| label)
    }
}

/// Assigns a policy and a region label to cleaned text.
#[derive(Debug, Clone)]
pub struct Categorizer {
    policies: KeywordTable,
    regions: KeywordTable,
}

impl Categorizer {
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the taxonomy is unusable (for
    /// example an empty policy or region table).
    pub fn new(taxonomy: &Taxonomy) -> Result<Self, ConfigError> {
        taxonomy.validate()?;
        Ok(Self {
            policies: KeywordTable::new(&taxonomy.policies),
            regions: KeywordTable::new(&taxonomy.regions),
        })
    }

    #[must_use]
    pub fn policy(&self, clean_text: &str) -> String {
        self.policies
            .best_match(clean_text)
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    }

    /// Region named in the text; otherwise the hint (mapped to a known
    /// label when it matches one); otherwise [`UNKNOWN_REGION`].
    #[must_use]
    pub fn region(&self, clean_text: &str, region_hint: Option<&str>) -> String {
        if let Some(label) = self.regions.best_match(clean_text) {
            return label.to_string();
        }

        match region_hint.map(str::trim).filter(|h| !h.is_empty()) {
            Some(hint) => self
                .regions
                .best_match(hint)
                .unwrap_or(hint)
                .to_string(),
            None => UNKNOWN_REGION.to_string(),
        }
    }

    /// Returns `(policy_label, region_label)`.
    #[must_use]
    pub fn categorize(&self, clean_text: &str, region_hint: Option<&str>) -> (String, String) {
        (self.policy(clean_text), self.region(clean_text, region_hint))
    }
}
