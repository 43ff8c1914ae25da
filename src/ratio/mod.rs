//! Activity ratios between paired normalized values.
//!
//! Two representations coexist and are never mixed:
//!
//! - the **log-ratio** `log2((v + p) / (g + p))`, used for per-sample ratios
//!   and the over/under-active bands;
//! - the **activity score** `v / (g + ε)`, a raw (non-log) ratio used for the
//!   taxon activity tiers.
//!
//! Both are defined for every pair `v, g ≥ 0` as long as the pseudocount is
//! positive. The pseudocount bounds the ratio at zero: `log_ratio(0, g, p)`
//! bottoms out at `log2(p / (g + p))` and `log_ratio(v, 0, p)` tops out at
//! `log2((v + p) / p)`.

use crate::data::ResolvedPair;
use crate::error::{ActivityError, Result};
use crate::normalize::DepthMatrix;
use log::debug;
use nalgebra::DMatrix;

/// Stabilized log2 ratio of an activity value over a genomic value.
///
/// Computed as `log2(v + p) - log2(g + p)`, which makes swapping the
/// arguments an exact negation. `v = g` gives exactly 0. NaN inputs (from
/// zero-depth samples) give NaN.
#[inline]
pub fn log_ratio(activity: f64, genomic: f64, pseudocount: f64) -> f64 {
    (activity + pseudocount).log2() - (genomic + pseudocount).log2()
}

/// Raw activity score `v / (g + ε)`; not log-transformed.
#[inline]
pub fn activity_score(activity: f64, genomic: f64, epsilon: f64) -> f64 {
    activity / (genomic + epsilon)
}

/// Per-feature, per-pair log-ratios.
#[derive(Debug, Clone)]
pub struct RatioMatrix {
    /// Ratios (features × sample pairs).
    pub data: DMatrix<f64>,
    /// Feature identifiers, in aligned order.
    pub feature_ids: Vec<String>,
    /// One label per sample pair.
    pub pair_labels: Vec<String>,
    /// Pseudocount used.
    pub pseudocount: f64,
}

impl RatioMatrix {
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_pairs(&self) -> usize {
        self.data.ncols()
    }

    pub fn get(&self, feature: usize, pair: usize) -> f64 {
        self.data[(feature, pair)]
    }

    /// Ratios of one feature across all pairs.
    pub fn row(&self, feature: usize) -> Vec<f64> {
        self.data.row(feature).iter().cloned().collect()
    }
}

/// Compute log-ratios for every aligned feature and every sample pair.
///
/// Both matrices must hold the same features in the same order (the output
/// of [`align_features`](crate::align::align_features) followed by
/// normalization). The whole matrix is produced in one pass.
pub fn compute_ratios(
    genomic: &DepthMatrix,
    activity: &DepthMatrix,
    pairs: &[ResolvedPair],
    pseudocount: f64,
) -> Result<RatioMatrix> {
    if !(pseudocount.is_finite() && pseudocount > 0.0) {
        return Err(ActivityError::InvalidParameter(format!(
            "Log pseudocount must be positive, got {}",
            pseudocount
        )));
    }
    if genomic.feature_ids != activity.feature_ids {
        return Err(ActivityError::InvalidParameter(
            "Genomic and activity matrices are not aligned on the same features".to_string(),
        ));
    }
    if pairs.is_empty() {
        return Err(ActivityError::EmptyData("No sample pairs to compute ratios for".to_string()));
    }
    for pair in pairs {
        if pair.genomic_col >= genomic.n_samples() || pair.activity_col >= activity.n_samples() {
            return Err(ActivityError::InvalidParameter(format!(
                "Sample pair '{}' points outside the matrices",
                pair.label
            )));
        }
    }

    let n_features = genomic.n_features();
    let data = DMatrix::from_fn(n_features, pairs.len(), |i, k| {
        let pair = &pairs[k];
        log_ratio(
            activity.get(i, pair.activity_col),
            genomic.get(i, pair.genomic_col),
            pseudocount,
        )
    });

    debug!(
        "Computed log2 ratios for {} features x {} sample pairs (pseudocount {})",
        n_features,
        pairs.len(),
        pseudocount
    );

    Ok(RatioMatrix {
        data,
        feature_ids: genomic.feature_ids.clone(),
        pair_labels: pairs.iter().map(|p| p.label.clone()).collect(),
        pseudocount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GRID: [f64; 8] = [0.0, 1e-9, 0.01, 0.5, 1.0, 3.7, 1234.5, 1e6];

    fn depth_matrix(features: &[&str], rows: Vec<Vec<f64>>, samples: &[&str]) -> DepthMatrix {
        let n = rows.len();
        let m = samples.len();
        DepthMatrix {
            data: DMatrix::from_fn(n, m, |i, j| rows[i][j]),
            feature_ids: features.iter().map(|s| s.to_string()).collect(),
            sample_ids: samples.iter().map(|s| s.to_string()).collect(),
            target: 1e6,
            depths: vec![1.0; m],
        }
    }

    #[test]
    fn test_equal_values_give_zero() {
        assert_eq!(log_ratio(0.0, 0.0, 1.0), 0.0);
        assert_eq!(log_ratio(0.0, 0.0, 0.01), 0.0);
        assert_eq!(log_ratio(42.0, 42.0, 1.0), 0.0);
    }

    #[test]
    fn test_known_values() {
        assert_relative_eq!(log_ratio(3.0, 0.0, 1.0), 2.0);
        assert_relative_eq!(log_ratio(0.0, 3.0, 1.0), -2.0);
        assert_relative_eq!(log_ratio(7.0, 1.0, 1.0), 2.0);
    }

    #[test]
    fn test_symmetry_is_exact() {
        for p in [1.0, 0.01] {
            for &v in &GRID {
                for &g in &GRID {
                    assert_eq!(log_ratio(v, g, p), -log_ratio(g, v, p));
                }
            }
        }
    }

    #[test]
    fn test_bounded_at_zero() {
        for p in [1.0, 0.01] {
            for &x in &GRID {
                let low = log_ratio(0.0, x, p);
                let high = log_ratio(x, 0.0, p);
                assert!(low.is_finite() && high.is_finite());
                assert_relative_eq!(low, (p / (x + p)).log2(), epsilon = 1e-12, max_relative = 1e-12);
                assert_relative_eq!(high, ((x + p) / p).log2(), epsilon = 1e-12, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_nan_propagates() {
        assert!(log_ratio(f64::NAN, 1.0, 1.0).is_nan());
        assert!(log_ratio(1.0, f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn test_activity_score() {
        assert_relative_eq!(activity_score(4.0, 1.99, 0.01), 2.0, max_relative = 1e-12);
        assert_eq!(activity_score(0.0, 0.0, 0.01), 0.0);
        assert_relative_eq!(activity_score(1.0, 0.0, 0.01), 100.0);
        assert!(activity_score(1.0, 0.0, 0.01).is_finite());
    }

    #[test]
    fn test_compute_ratios() {
        let genomic = depth_matrix(&["g1", "g2"], vec![vec![0.0, 3.0], vec![1.0, 1.0]], &["S1_MG", "S2_MG"]);
        let activity = depth_matrix(&["g1", "g2"], vec![vec![3.0, 0.0], vec![1.0, 7.0]], &["S2_MTX", "S1_MTX"]);
        let pairs = vec![
            ResolvedPair { label: "S1".into(), genomic_col: 0, activity_col: 1 },
            ResolvedPair { label: "S2".into(), genomic_col: 1, activity_col: 0 },
        ];

        let ratios = compute_ratios(&genomic, &activity, &pairs, 1.0).unwrap();
        assert_eq!(ratios.n_features(), 2);
        assert_eq!(ratios.n_pairs(), 2);
        assert_eq!(ratios.pair_labels, vec!["S1", "S2"]);
        // g1/S1: activity 0, genomic 0
        assert_eq!(ratios.get(0, 0), 0.0);
        // g1/S2: activity 3, genomic 3
        assert_eq!(ratios.get(0, 1), 0.0);
        // g2/S1: activity 7, genomic 1
        assert_relative_eq!(ratios.get(1, 0), 2.0);
        // g2/S2: activity 1, genomic 1
        assert_eq!(ratios.get(1, 1), 0.0);
    }

    #[test]
    fn test_compute_ratios_rejects_misaligned() {
        let genomic = depth_matrix(&["g1", "g2"], vec![vec![1.0], vec![1.0]], &["S1"]);
        let activity = depth_matrix(&["g2", "g1"], vec![vec![1.0], vec![1.0]], &["S1"]);
        let pairs = vec![ResolvedPair { label: "S1".into(), genomic_col: 0, activity_col: 0 }];

        assert!(compute_ratios(&genomic, &activity, &pairs, 1.0).is_err());
        assert!(compute_ratios(&genomic, &genomic, &pairs, 0.0).is_err());
        assert!(compute_ratios(&genomic, &genomic, &[], 1.0).is_err());
    }
}
