//! Lexicon-based polarity scoring for civic policy discussion.

use std::collections::HashMap;
use std::sync::Arc;

use civpulse_core::LexiconEntry;

use crate::types::SentimentLabel;

/// Polarity above this is positive (strict).
pub const POSITIVE_THRESHOLD: f64 = 0.1;
/// Polarity below this is negative (strict).
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Base word weights.
///
/// Keys are lowercase single words; values lie in `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("wonderful", 1.0),
    ("fantastic", 0.4),
    ("best", 1.0),
    ("better", 0.5),
    ("improved", 0.5),
    ("improve", 0.4),
    ("improving", 0.4),
    ("effective", 0.6),
    ("effectively", 0.6),
    ("easier", 0.4),
    ("easy", 0.43),
    ("accessible", 0.4),
    ("helpful", 0.5),
    ("helping", 0.3),
    ("helped", 0.3),
    ("benefit", 0.4),
    ("benefiting", 0.4),
    ("boosting", 0.4),
    ("growing", 0.3),
    ("growth", 0.3),
    ("success", 0.6),
    ("successful", 0.75),
    ("positive", 0.23),
    ("progress", 0.4),
    ("transparent", 0.4),
    ("happy", 0.8),
    ("love", 0.5),
    ("proud", 0.8),
    ("significantly", 0.38),
    ("well", 0.3),
    ("welcome", 0.8),
    ("support", 0.3),
    ("clean", 0.37),
    // Negative signals
    ("bad", -0.7),
    ("poor", -0.4),
    ("terrible", -1.0),
    ("horrible", -1.0),
    ("awful", -1.0),
    ("worst", -1.0),
    ("worse", -0.4),
    ("disappointing", -0.6),
    ("disappointed", -0.75),
    ("failed", -0.5),
    ("failure", -0.5),
    ("fail", -0.5),
    ("useless", -0.5),
    ("corrupt", -0.7),
    ("corruption", -0.7),
    ("scam", -0.8),
    ("waste", -0.2),
    ("delay", -0.3),
    ("delayed", -0.3),
    ("problem", -0.3),
    ("problems", -0.3),
    ("challenges", -0.2),
    ("difficult", -0.5),
    ("expensive", -0.5),
    ("dirty", -0.6),
    ("broken", -0.4),
    ("angry", -0.5),
    ("sad", -0.5),
    ("fraud", -0.8),
    ("unfair", -0.5),
];

const NEGATORS: &[&str] = &["not", "no", "never", "nor", "cannot", "neither", "none"];
const NEGATION_FACTOR: f64 = -0.5;

const INTENSIFIERS: &[&str] = &["very", "really", "extremely", "highly", "so"];
const INTENSIFIER_FACTOR: f64 = 1.3;

/// Underlying polarity function. Implementations must return values in
/// `[-1.0, 1.0]`; out-of-range or non-finite values are clamped by
/// [`SentimentScorer`].
pub trait PolarityModel: Send + Sync {
    fn polarity(&self, clean_text: &str) -> f64;
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

/// Word-weight polarity with simple negation and intensification.
///
/// Each lexicon word contributes its weight, multiplied by
/// [`INTENSIFIER_FACTOR`] per preceding intensifier and by
/// [`NEGATION_FACTOR`] when preceded by a negator. Modifiers apply to the
/// next lexicon word only. The polarity is the mean over matched words,
/// clamped to `[-1.0, 1.0]`; text without lexicon words scores `0.0`.
#[derive(Debug, Clone)]
pub struct LexiconModel {
    weights: HashMap<String, f64>,
}

impl Default for LexiconModel {
    fn default() -> Self {
        Self {
            weights: LEXICON
                .iter()
                .map(|&(word, weight)| (word.to_string(), weight))
                .collect(),
        }
    }
}

impl LexiconModel {
    /// Add or override words. Entries are lower-cased and weights clamped.
    #[must_use]
    pub fn with_entries(mut self, entries: &[LexiconEntry]) -> Self {
        for entry in entries {
            self.weights.insert(
                entry.word.trim().to_lowercase(),
                entry.weight.clamp(-1.0, 1.0),
            );
        }
        self
    }

    #[must_use]
    pub fn weight(&self, word: &str) -> Option<f64> {
        self.weights.get(word).copied()
    }
}

impl PolarityModel for LexiconModel {
    fn polarity(&self, clean_text: &str) -> f64 {
        let mut total = 0.0_f64;
        let mut matched = 0u32;
        let mut negated = false;
        let mut boost = 1.0_f64;

        for token in clean_text.split_whitespace() {
            let word = token
                .trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }

            if is_negator(&word) {
                negated = true;
                continue;
            }
            if INTENSIFIERS.contains(&word.as_str()) {
                boost *= INTENSIFIER_FACTOR;
                continue;
            }

            if let Some(weight) = self.weight(&word) {
                let mut value = weight * boost;
                if negated {
                    value *= NEGATION_FACTOR;
                }
                total += value.clamp(-1.0, 1.0);
                matched += 1;
                negated = false;
                boost = 1.0;
            }
        }

        if matched == 0 {
            return 0.0;
        }
        (total / f64::from(matched)).clamp(-1.0, 1.0)
    }
}

/// Map a polarity to its label using the strict thresholds.
#[must_use]
pub fn classify(polarity: f64) -> SentimentLabel {
    if polarity > POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if polarity < NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Scores cleaned text with a replaceable [`PolarityModel`].
#[derive(Clone)]
pub struct SentimentScorer {
    model: Arc<dyn PolarityModel>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new(Arc::new(LexiconModel::default()))
    }
}

impl std::fmt::Debug for SentimentScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentScorer").finish_non_exhaustive()
    }
}

impl SentimentScorer {
    #[must_use]
    pub fn new(model: Arc<dyn PolarityModel>) -> Self {
        Self { model }
    }

    /// Default lexicon extended with `entries`.
    #[must_use]
    pub fn with_lexicon(entries: &[LexiconEntry]) -> Self {
        Self::new(Arc::new(LexiconModel::default().with_entries(entries)))
    }

    /// Returns `(polarity, label)`. Blank text is `(0.0, Neutral)`.
    #[must_use]
    pub fn score(&self, clean_text: &str) -> (f64, SentimentLabel) {
        if clean_text.trim().is_empty() {
            return (0.0, SentimentLabel::Neutral);
        }
        let raw = self.model.polarity(clean_text);
        let polarity = if raw.is_finite() {
            raw.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        (polarity, classify(polarity))
    }
}
