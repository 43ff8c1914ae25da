//! Ranking and top-N / bottom-N selection.
//!
//! Sorting is stable: features with equal keys keep their input order, so
//! repeated runs over the same table give the same order. Features whose key
//! is undefined (NaN or missing) always sort after every defined key.

use crate::combine::CombinedRecord;
use crate::data::{ActivityRecord, FeatureActivity};
use crate::error::{ActivityError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Statistics a table can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    MeanLog2Ratio,
    StdDev,
    Log2Ratio,
    ActivityScore,
    MeanGenomic,
    MeanActivity,
    MeanAbundance,
    MeanCoverage,
}

impl Statistic {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MeanLog2Ratio => "Mean_Log2_Ratio",
            Self::StdDev => "StdDev",
            Self::Log2Ratio => "Log2_Ratio",
            Self::ActivityScore => "Activity_Score",
            Self::MeanGenomic => "Mean_Genomic",
            Self::MeanActivity => "Mean_Activity",
            Self::MeanAbundance => "Mean_RA",
            Self::MeanCoverage => "Mean_Cov",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Ascending,
    Descending,
}

/// A record that exposes named statistics.
pub trait Ranked {
    fn feature_id(&self) -> &str;

    /// Value of a statistic. `Err` when the record type does not carry it,
    /// `Ok(None)` when it carries it but the value is undefined.
    fn statistic(&self, stat: Statistic) -> Result<Option<f64>>;
}

fn unsupported(stat: Statistic, kind: &str) -> ActivityError {
    ActivityError::InvalidParameter(format!("{} records cannot be ranked by {}", kind, stat.name()))
}

fn defined(v: f64) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

impl Ranked for ActivityRecord {
    fn feature_id(&self) -> &str {
        &self.feature_id
    }

    fn statistic(&self, stat: Statistic) -> Result<Option<f64>> {
        match stat {
            Statistic::MeanLog2Ratio => Ok(defined(self.mean_log2_ratio)),
            Statistic::StdDev => Ok(defined(self.std_dev)),
            other => Err(unsupported(other, "Activity")),
        }
    }
}

impl Ranked for FeatureActivity {
    fn feature_id(&self) -> &str {
        &self.feature_id
    }

    fn statistic(&self, stat: Statistic) -> Result<Option<f64>> {
        match stat {
            Statistic::Log2Ratio => Ok(defined(self.log2_ratio)),
            Statistic::ActivityScore => Ok(defined(self.activity_score)),
            Statistic::MeanGenomic => Ok(defined(self.mean_genomic)),
            Statistic::MeanActivity => Ok(defined(self.mean_activity)),
            other => Err(unsupported(other, "Feature activity")),
        }
    }
}

impl Ranked for CombinedRecord {
    fn feature_id(&self) -> &str {
        &self.bin_id
    }

    fn statistic(&self, stat: Statistic) -> Result<Option<f64>> {
        match stat {
            Statistic::MeanAbundance => Ok(self.mean_abundance.and_then(defined)),
            Statistic::MeanCoverage => Ok(self.mean_coverage.and_then(defined)),
            other => Err(unsupported(other, "Combined")),
        }
    }
}

/// A sorted view over borrowed records.
#[derive(Debug, Clone)]
pub struct Ranking<'a, T> {
    pub statistic: Statistic,
    pub order: Order,
    entries: Vec<(&'a T, Option<f64>)>,
}

impl<'a, T: Ranked> Ranking<'a, T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records in ranked order.
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.entries.iter().map(|(r, _)| *r)
    }

    /// First `n` records (fewer if the ranking is shorter).
    pub fn top(&self, n: usize) -> Vec<&'a T> {
        self.entries.iter().take(n).map(|(r, _)| *r).collect()
    }

    /// Last `n` records, still in ranked order.
    pub fn bottom(&self, n: usize) -> Vec<&'a T> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].iter().map(|(r, _)| *r).collect()
    }

    /// Keep only records whose key satisfies `keep`; order is unchanged.
    pub fn filter<F>(self, keep: F) -> Self
    where
        F: Fn(f64) -> bool,
    {
        let entries = self
            .entries
            .into_iter()
            .filter(|(_, key)| key.map(&keep).unwrap_or(false))
            .collect();
        Self {
            statistic: self.statistic,
            order: self.order,
            entries,
        }
    }

    /// Feature ids in ranked order.
    pub fn feature_ids(&self) -> Vec<&'a str> {
        self.entries.iter().map(|&(r, _)| r.feature_id()).collect()
    }
}

fn compare_keys(a: Option<f64>, b: Option<f64>, order: Order) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match order {
            Order::Ascending => x.total_cmp(&y),
            Order::Descending => y.total_cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank records by a statistic.
///
/// The input is left untouched; the ranking borrows it.
pub fn rank<T: Ranked>(records: &[T], statistic: Statistic, order: Order) -> Result<Ranking<'_, T>> {
    let mut entries = records
        .iter()
        .map(|r| r.statistic(statistic).map(|key| (r, key)))
        .collect::<Result<Vec<_>>>()?;

    // slice::sort_by is stable
    entries.sort_by(|a, b| compare_keys(a.1, b.1, order));

    Ok(Ranking {
        statistic,
        order,
        entries,
    })
}
