//! Threshold and quadrant labeling of features.
//!
//! Every rule uses a strict `>` for the "high" side: a value exactly equal to
//! its threshold counts as not exceeding it, on both axes.

use crate::aggregate::median;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an axis threshold comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Threshold {
    /// A fixed constant.
    Fixed(f64),
    /// The median of the axis over all features.
    Median,
}

impl Threshold {
    /// Resolve against the axis values. `None` when the median is requested
    /// but no value is defined.
    pub fn resolve(&self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Fixed(t) => Some(*t),
            Self::Median => median(values),
        }
    }
}

/// Four-quadrant label of a feature on the abundance × activity plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuadrantLabel {
    AbundantActive,
    AbundantInactive,
    RareActive,
    RareInactive,
}

impl QuadrantLabel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AbundantActive => "Abundant_Active",
            Self::AbundantInactive => "Abundant_Inactive",
            Self::RareActive => "Rare_Active",
            Self::RareInactive => "Rare_Inactive",
        }
    }
}

/// Assign a quadrant from two summary values and their thresholds.
///
/// Returns `None` when either value is NaN.
pub fn classify_quadrant(
    abundance: f64,
    activity: f64,
    abundance_threshold: f64,
    activity_threshold: f64,
) -> Option<QuadrantLabel> {
    if abundance.is_nan() || activity.is_nan() {
        return None;
    }
    let label = match (abundance > abundance_threshold, activity > activity_threshold) {
        (true, true) => QuadrantLabel::AbundantActive,
        (true, false) => QuadrantLabel::AbundantInactive,
        (false, true) => QuadrantLabel::RareActive,
        (false, false) => QuadrantLabel::RareInactive,
    };
    Some(label)
}

/// Label for a record merged from two independently sourced tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CombinedLabel {
    HighHigh,
    HighLow,
    LowHigh,
    LowLow,
    /// At least one source has no value for this record.
    Incomplete,
}

impl CombinedLabel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::HighHigh => "High_Abundance_High_Coverage",
            Self::HighLow => "High_Abundance_Low_Coverage",
            Self::LowHigh => "Low_Abundance_High_Coverage",
            Self::LowLow => "Low_Abundance_Low_Coverage",
            Self::Incomplete => "Incomplete_Data",
        }
    }
}

/// Classify a combined record.
///
/// The missing-data check runs first: a missing (or NaN) value on either axis
/// gives [`CombinedLabel::Incomplete`] whatever the other axis holds.
pub fn classify_combined(
    x: Option<f64>,
    y: Option<f64>,
    x_threshold: f64,
    y_threshold: f64,
) -> CombinedLabel {
    let (x, y) = match (x, y) {
        (Some(x), Some(y)) if !x.is_nan() && !y.is_nan() => (x, y),
        _ => return CombinedLabel::Incomplete,
    };
    match (x > x_threshold, y > y_threshold) {
        (true, true) => CombinedLabel::HighHigh,
        (true, false) => CombinedLabel::HighLow,
        (false, true) => CombinedLabel::LowHigh,
        (false, false) => CombinedLabel::LowLow,
    }
}

/// Tier of a raw activity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityTier {
    /// Score above the high threshold.
    HighlyActive,
    Intermediate,
    /// Score below the low threshold.
    Dormant,
    /// Score is NaN.
    Undefined,
}

impl ActivityTier {
    pub fn from_score(score: f64, threshold_high: f64, threshold_low: f64) -> Self {
        if score.is_nan() {
            Self::Undefined
        } else if score > threshold_high {
            Self::HighlyActive
        } else if score < threshold_low {
            Self::Dormant
        } else {
            Self::Intermediate
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::HighlyActive => "highly_active",
            Self::Intermediate => "intermediate",
            Self::Dormant => "dormant",
            Self::Undefined => "undefined",
        }
    }
}

/// Count occurrences of each label, in label order.
pub fn count_labels<L, I>(labels: I) -> BTreeMap<L, usize>
where
    L: Ord,
    I: IntoIterator<Item = L>,
{
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}
