//! Reduction of per-sample ratios to per-feature summaries.
//!
//! Undefined values (NaN, from zero-depth samples) are handled by an explicit
//! [`NanPolicy`]. The default, [`NanPolicy::Skip`], excludes them from the
//! mean and standard deviation; it never counts them as zero.

use crate::data::{ActivityRecord, ActivityTable};
use crate::ratio::RatioMatrix;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// How undefined values enter a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NanPolicy {
    /// Drop NaN values before computing statistics.
    #[default]
    Skip,
    /// Any NaN makes the summary NaN.
    Propagate,
}

/// Mean and dispersion of one set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    /// Sample standard deviation (n − 1); 0 for a single value.
    pub std_dev: f64,
    /// Values that entered the summary.
    pub n: usize,
}

/// Summarize values under the given NaN policy.
///
/// With no usable values both statistics are NaN.
pub fn summarize(values: &[f64], policy: NanPolicy) -> Summary {
    let used: Vec<f64> = match policy {
        NanPolicy::Skip => values.iter().copied().filter(|v| !v.is_nan()).collect(),
        NanPolicy::Propagate => {
            if values.iter().any(|v| v.is_nan()) {
                return Summary {
                    mean: f64::NAN,
                    std_dev: f64::NAN,
                    n: values.iter().filter(|v| !v.is_nan()).count(),
                };
            }
            values.to_vec()
        }
    };

    match used.len() {
        0 => Summary {
            mean: f64::NAN,
            std_dev: f64::NAN,
            n: 0,
        },
        1 => Summary {
            mean: used[0],
            std_dev: 0.0,
            n: 1,
        },
        n => Summary {
            mean: used.iter().mean(),
            std_dev: used.iter().std_dev(),
            n,
        },
    }
}

/// Median of the defined (non-NaN) values, or `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Build the activity table from a ratio matrix.
///
/// Records keep the ratio matrix's feature order.
pub fn aggregate_ratios(ratios: &RatioMatrix, policy: NanPolicy) -> ActivityTable {
    let records: Vec<ActivityRecord> = (0..ratios.n_features())
        .into_par_iter()
        .map(|i| {
            let values = ratios.row(i);
            let summary = summarize(&values, policy);
            ActivityRecord {
                feature_id: ratios.feature_ids[i].clone(),
                ratios: values,
                mean_log2_ratio: summary.mean,
                std_dev: summary.std_dev,
                n_defined: summary.n,
            }
        })
        .collect();

    let n_undefined = records.iter().filter(|r| r.mean_log2_ratio.is_nan()).count();
    if n_undefined > 0 {
        warn!("{} features have no defined ratio in any sample pair", n_undefined);
    }

    ActivityTable {
        pair_labels: ratios.pair_labels.clone(),
        pseudocount: ratios.pseudocount,
        records,
    }
}

/// Activity band of a feature, decided on its mean log-ratio.
///
/// Bands are `(high, +∞)`, `[0, high]` and `(−∞, 0)`. They are deliberately
/// not symmetric around zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityBand {
    Over,
    Moderate,
    Under,
    /// Mean is NaN: no sample pair had a defined ratio.
    Undefined,
}

impl ActivityBand {
    pub fn from_mean(mean: f64, threshold_high: f64) -> Self {
        if mean.is_nan() {
            Self::Undefined
        } else if mean > threshold_high {
            Self::Over
        } else if mean >= 0.0 {
            Self::Moderate
        } else {
            Self::Under
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Over => "over_active",
            Self::Moderate => "moderate",
            Self::Under => "under_active",
            Self::Undefined => "undefined",
        }
    }
}

/// Feature counts per activity band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub over: usize,
    pub moderate: usize,
    pub under: usize,
    pub undefined: usize,
}

impl BandCounts {
    pub fn total(&self) -> usize {
        self.over + self.moderate + self.under + self.undefined
    }
}

/// Count features per band.
pub fn band_counts(table: &ActivityTable, threshold_high: f64) -> BandCounts {
    table
        .records
        .iter()
        .fold(BandCounts::default(), |mut counts, r| {
            match ActivityBand::from_mean(r.mean_log2_ratio, threshold_high) {
                ActivityBand::Over => counts.over += 1,
                ActivityBand::Moderate => counts.moderate += 1,
                ActivityBand::Under => counts.under += 1,
                ActivityBand::Undefined => counts.undefined += 1,
            }
            counts
        })
}

/// Corpus-wide summary of the mean log-ratios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioSummary {
    pub n_features: usize,
    pub threshold_high: f64,
    pub bands: BandCounts,
    /// Mean of the per-feature means (NaN means skipped).
    pub mean_of_means: f64,
    /// Median of the per-feature means (NaN means skipped).
    pub median_of_means: f64,
}

impl RatioSummary {
    fn percent(&self, n: usize) -> f64 {
        if self.n_features == 0 {
            0.0
        } else {
            n as f64 / self.n_features as f64 * 100.0
        }
    }
}

impl std::fmt::Display for RatioSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = self.threshold_high;
        writeln!(f, "Activity ratio summary ({} features)", self.n_features)?;
        writeln!(
            f,
            "  Over-active   (mean log2 ratio > {}):       {:6} ({:5.1}%)",
            t,
            self.bands.over,
            self.percent(self.bands.over)
        )?;
        writeln!(
            f,
            "  Moderate      (0 <= mean log2 ratio <= {}): {:6} ({:5.1}%)",
            t,
            self.bands.moderate,
            self.percent(self.bands.moderate)
        )?;
        writeln!(
            f,
            "  Under-active  (mean log2 ratio < 0):        {:6} ({:5.1}%)",
            self.bands.under,
            self.percent(self.bands.under)
        )?;
        if self.bands.undefined > 0 {
            writeln!(f, "  Undefined (no defined ratio): {}", self.bands.undefined)?;
        }
        writeln!(f, "  Mean of mean ratios:   {:.2}", self.mean_of_means)?;
        writeln!(f, "  Median of mean ratios: {:.2}", self.median_of_means)?;
        Ok(())
    }
}

/// Summarize a whole activity table.
pub fn summarize_table(table: &ActivityTable, threshold_high: f64) -> RatioSummary {
    let means: Vec<f64> = table.records.iter().map(|r| r.mean_log2_ratio).collect();
    let bands = band_counts(table, threshold_high);

    info!(
        "Bands: {} over-active, {} moderate, {} under-active, {} undefined",
        bands.over, bands.moderate, bands.under, bands.undefined
    );

    RatioSummary {
        n_features: table.records.len(),
        threshold_high,
        bands,
        mean_of_means: summarize(&means, NanPolicy::Skip).mean,
        median_of_means: median(&means).unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn ratio_matrix(rows: Vec<Vec<f64>>) -> RatioMatrix {
        let n = rows.len();
        let m = rows[0].len();
        RatioMatrix {
            data: DMatrix::from_fn(n, m, |i, j| rows[i][j]),
            feature_ids: (0..n).map(|i| format!("g{}", i)).collect(),
            pair_labels: (0..m).map(|j| format!("S{}", j)).collect(),
            pseudocount: 1.0,
        }
    }

    #[test]
    fn test_summarize_sample_std() {
        let s = summarize(&[1.0, 2.0, 3.0, 4.0], NanPolicy::Skip);
        assert_relative_eq!(s.mean, 2.5, max_relative = 1e-12);
        // n-1 denominator: var = 5/3
        assert_relative_eq!(s.std_dev, (5.0f64 / 3.0).sqrt(), max_relative = 1e-12);
        assert_eq!(s.n, 4);
    }

    #[test]
    fn test_summarize_single_value() {
        let s = summarize(&[1.5], NanPolicy::Skip);
        assert_eq!(s.mean, 1.5);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn test_summarize_nan_policies() {
        let values = [1.0, f64::NAN, 3.0];

        let skipped = summarize(&values, NanPolicy::Skip);
        assert_relative_eq!(skipped.mean, 2.0, max_relative = 1e-12);
        assert_eq!(skipped.n, 2);

        let propagated = summarize(&values, NanPolicy::Propagate);
        assert!(propagated.mean.is_nan());
        assert!(propagated.std_dev.is_nan());
        assert_eq!(propagated.n, 2);

        let none = summarize(&[f64::NAN, f64::NAN], NanPolicy::Skip);
        assert!(none.mean.is_nan());
        assert_eq!(none.n, 0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[f64::NAN, 5.0]), Some(5.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ActivityBand::from_mean(2.0001, 2.0), ActivityBand::Over);
        assert_eq!(ActivityBand::from_mean(2.0, 2.0), ActivityBand::Moderate);
        assert_eq!(ActivityBand::from_mean(0.0, 2.0), ActivityBand::Moderate);
        assert_eq!(ActivityBand::from_mean(-0.0001, 2.0), ActivityBand::Under);
        assert_eq!(ActivityBand::from_mean(-5.0, 2.0), ActivityBand::Under);
        assert_eq!(ActivityBand::from_mean(f64::NAN, 2.0), ActivityBand::Undefined);
    }

    #[test]
    fn test_bands_partition_features() {
        let means = [-3.0, -0.5, 0.0, 0.7, 2.0, 2.5, 9.0, -1e-12, 1.999];
        let ratios = ratio_matrix(means.iter().map(|&m| vec![m]).collect());
        let table = aggregate_ratios(&ratios, NanPolicy::Skip);

        let counts = band_counts(&table, 2.0);
        assert_eq!(counts.over, 2);
        assert_eq!(counts.moderate, 4);
        assert_eq!(counts.under, 3);
        assert_eq!(counts.undefined, 0);
        assert_eq!(counts.over + counts.moderate + counts.under, table.records.len());
    }

    #[test]
    fn test_aggregate_ratios() {
        let ratios = ratio_matrix(vec![vec![1.0, 3.0], vec![f64::NAN, -2.0], vec![f64::NAN, f64::NAN]]);
        let table = aggregate_ratios(&ratios, NanPolicy::Skip);

        assert_eq!(table.records.len(), 3);
        assert_eq!(table.pair_labels, vec!["S0", "S1"]);

        let first = &table.records[0];
        assert_eq!(first.feature_id, "g0");
        assert_relative_eq!(first.mean_log2_ratio, 2.0, max_relative = 1e-12);
        assert_relative_eq!(first.std_dev, 2.0f64.sqrt(), max_relative = 1e-12);

        let second = &table.records[1];
        assert_eq!(second.mean_log2_ratio, -2.0);
        assert_eq!(second.std_dev, 0.0);
        assert_eq!(second.n_defined, 1);

        assert!(table.records[2].mean_log2_ratio.is_nan());

        let summary = summarize_table(&table, 2.0);
        assert_eq!(summary.bands.moderate, 1);
        assert_eq!(summary.bands.under, 1);
        assert_eq!(summary.bands.undefined, 1);
        assert_eq!(summary.bands.total(), 3);
        assert_relative_eq!(summary.mean_of_means, 0.0, epsilon = 1e-12);
    }
}
