//! Explicit pairing of genomic samples with activity samples.
//!
//! The engine never guesses which activity column belongs to which genomic
//! column. Callers either hand over the table directly or derive it from a
//! naming convention, and every pair is checked against both matrices before
//! any ratio is computed.

use crate::data::CountMatrix;
use crate::error::{ActivityError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One genomic sample paired with its activity sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePair {
    /// Sample id in the genomic matrix.
    pub genomic: String,
    /// Sample id in the activity matrix.
    pub activity: String,
    /// Label used for output columns derived from this pair.
    pub label: String,
}

/// A pair resolved to column indices of both matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    pub label: String,
    pub genomic_col: usize,
    pub activity_col: usize,
}

/// Ordered table of sample pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePairing {
    pairs: Vec<SamplePair>,
}

impl SamplePairing {
    /// Build from explicit (genomic, activity) pairs; labels are the genomic ids.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(g, a)| {
                let genomic = g.into();
                SamplePair {
                    label: genomic.clone(),
                    genomic,
                    activity: a.into(),
                }
            })
            .collect();
        Self { pairs }
    }

    /// Build from fully specified pairs, keeping their labels.
    pub fn from_sample_pairs(pairs: Vec<SamplePair>) -> Self {
        Self { pairs }
    }

    /// Derive pairs from a token substitution, e.g. `S1_MG` -> `S1_MTX`.
    ///
    /// Only genomic samples containing `from` take part. The label drops the
    /// `_<from>` suffix, so `S1_MG` is reported as `S1`.
    pub fn from_substitution(genomic_ids: &[String], from: &str, to: &str) -> Result<Self> {
        if from.is_empty() {
            return Err(ActivityError::InvalidParameter(
                "Substitution token must not be empty".to_string(),
            ));
        }
        let suffix = format!("_{}", from);
        let pairs = genomic_ids
            .iter()
            .filter(|id| id.contains(from))
            .map(|id| SamplePair {
                genomic: id.clone(),
                activity: id.replace(from, to),
                label: id.replace(&suffix, ""),
            })
            .collect();
        Ok(Self { pairs })
    }

    /// Derive pairs with a regular expression.
    ///
    /// Genomic samples matching `pattern` are paired with
    /// `pattern.replace(id, replacement)`; capture groups (`$1`) are allowed.
    pub fn from_pattern(genomic_ids: &[String], pattern: &str, replacement: &str) -> Result<Self> {
        let re = Regex::new(pattern)?;
        let pairs = genomic_ids
            .iter()
            .filter(|id| re.is_match(id))
            .map(|id| SamplePair {
                genomic: id.clone(),
                activity: re.replace(id, replacement).into_owned(),
                label: id.clone(),
            })
            .collect();
        Ok(Self { pairs })
    }

    /// The pairs in order.
    pub fn pairs(&self) -> &[SamplePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Resolve every pair to column indices.
    ///
    /// A pair whose genomic or activity sample is absent is a configuration
    /// error for the whole run, not something to skip.
    pub fn resolve(&self, genomic: &CountMatrix, activity: &CountMatrix) -> Result<Vec<ResolvedPair>> {
        if self.pairs.is_empty() {
            return Err(ActivityError::EmptyData(
                "Sample pairing contains no pairs".to_string(),
            ));
        }

        self.pairs
            .iter()
            .map(|pair| {
                let genomic_col = genomic.sample_index(&pair.genomic).ok_or_else(|| {
                    ActivityError::MissingPairing {
                        sample: pair.genomic.clone(),
                        paired: pair.activity.clone(),
                        missing: pair.genomic.clone(),
                        side: "genomic",
                    }
                })?;
                let activity_col = activity.sample_index(&pair.activity).ok_or_else(|| {
                    ActivityError::MissingPairing {
                        sample: pair.genomic.clone(),
                        paired: pair.activity.clone(),
                        missing: pair.activity.clone(),
                        side: "activity",
                    }
                })?;
                Ok(ResolvedPair {
                    label: pair.label.clone(),
                    genomic_col,
                    activity_col,
                })
            })
            .collect()
    }
}
