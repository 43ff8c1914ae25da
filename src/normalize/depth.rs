//! Depth normalization (per-million or percentage scaling).
//!
//! Each count is divided by its sample total and multiplied by a fixed
//! target, so every sample sums to the same constant regardless of how deeply
//! it was sequenced:
//!
//! `M'[f, s] = M[f, s] / Σ_f M[f, s] × K`
//!
//! A sample whose total is zero has no defined scaling. Its normalized
//! column is all-NaN and is reported by [`DepthMatrix::check`], never
//! silently zeroed.

use crate::data::CountMatrix;
use crate::error::{ActivityError, Result};
use log::{debug, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Relative tolerance for the column-sum self-check.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Result of depth normalization.
#[derive(Debug, Clone, Serialize)]
pub struct DepthMatrix {
    /// The normalized data (features × samples).
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Feature identifiers.
    pub feature_ids: Vec<String>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
    /// Target column total (1e6 for CPM, 100 for percent).
    pub target: f64,
    /// Sample totals before normalization.
    pub depths: Vec<f64>,
}

impl DepthMatrix {
    /// Get the normalized value for a feature and sample.
    pub fn get(&self, feature: usize, sample: usize) -> f64 {
        self.data[(feature, sample)]
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Get a row (feature) as a vector.
    pub fn row(&self, feature: usize) -> Vec<f64> {
        self.data.row(feature).iter().cloned().collect()
    }

    /// Get a column (sample) as a vector.
    pub fn col(&self, sample: usize) -> Vec<f64> {
        self.data.column(sample).iter().cloned().collect()
    }

    /// Samples whose input total was zero.
    pub fn zero_depth_samples(&self) -> Vec<&str> {
        self.depths
            .iter()
            .zip(&self.sample_ids)
            .filter(|(&d, _)| d == 0.0)
            .map(|(_, id)| id.as_str())
            .collect()
    }

    /// Verify that every sample with non-zero depth sums to the target.
    pub fn check(&self) -> NormalizationCheck {
        let samples = (0..self.n_samples())
            .map(|j| {
                let column_sum: f64 = self.data.column(j).iter().sum();
                let status = if self.depths[j] == 0.0 {
                    CheckStatus::Undefined
                } else if ((column_sum - self.target) / self.target).abs() <= SUM_TOLERANCE {
                    CheckStatus::Ok
                } else {
                    CheckStatus::Failed
                };
                SampleCheck {
                    sample_id: self.sample_ids[j].clone(),
                    depth: self.depths[j],
                    column_sum,
                    status,
                }
            })
            .collect();

        NormalizationCheck {
            target: self.target,
            tolerance: SUM_TOLERANCE,
            samples,
        }
    }

    /// Write the normalized matrix to a TSV file. NaN cells are written as `NaN`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        write!(writer, "feature_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (i, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for j in 0..self.n_samples() {
                write!(writer, "\t{}", self.get(i, j))?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Outcome of the column-sum check for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    /// Column sums to the target within tolerance.
    Ok,
    /// Zero input depth; the column is NaN by definition.
    Undefined,
    /// Non-zero depth but the column does not reach the target.
    Failed,
}

/// Per-sample line of a [`NormalizationCheck`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleCheck {
    pub sample_id: String,
    pub depth: f64,
    pub column_sum: f64,
    pub status: CheckStatus,
}

/// Report of the normalization self-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationCheck {
    pub target: f64,
    pub tolerance: f64,
    pub samples: Vec<SampleCheck>,
}

impl NormalizationCheck {
    /// True when no sample failed. Zero-depth samples do not fail the check.
    pub fn is_valid(&self) -> bool {
        self.samples.iter().all(|s| s.status != CheckStatus::Failed)
    }

    /// Number of zero-depth (all-NaN) samples.
    pub fn n_undefined(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.status == CheckStatus::Undefined)
            .count()
    }

    /// Smallest and largest column sum over samples with defined columns.
    pub fn sum_range(&self) -> Option<(f64, f64)> {
        self.samples
            .iter()
            .filter(|s| s.status != CheckStatus::Undefined)
            .map(|s| s.column_sum)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Turn a failed check into an error naming the offending samples.
    pub fn ensure_valid(&self) -> Result<()> {
        let failed: Vec<String> = self
            .samples
            .iter()
            .filter(|s| s.status == CheckStatus::Failed)
            .map(|s| format!("{} (sum {})", s.sample_id, s.column_sum))
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ActivityError::NormalizationCheck(format!(
                "columns do not sum to {}: {}",
                self.target,
                failed.join(", ")
            )))
        }
    }
}

/// Normalize every sample of a matrix to the given column total.
///
/// # Arguments
/// * `counts` - Count matrix
/// * `target` - Column total after scaling (see [`scale`](super::scale))
///
/// # Example
/// ```ignore
/// let cpm = norm_depth(&counts, scale::CPM)?;
/// cpm.check().ensure_valid()?;
/// ```
pub fn norm_depth(counts: &CountMatrix, target: f64) -> Result<DepthMatrix> {
    let n_features = counts.n_features();
    let n_samples = counts.n_samples();

    if n_features == 0 || n_samples == 0 {
        return Err(ActivityError::EmptyData(
            "Cannot normalize an empty matrix".to_string(),
        ));
    }

    if !(target.is_finite() && target > 0.0) {
        return Err(ActivityError::InvalidParameter(
            "Normalization target must be positive".to_string(),
        ));
    }

    // Each denominator is computed once per sample.
    let depths = counts.col_sums();

    for (j, &depth) in depths.iter().enumerate() {
        if depth == 0.0 {
            warn!(
                "Sample {} has zero total, its normalized column is undefined (NaN)",
                counts.sample_ids()[j]
            );
        }
    }

    let normalized_cols: Vec<Vec<f64>> = (0..n_samples)
        .into_par_iter()
        .map(|j| {
            let depth = depths[j];
            (0..n_features)
                .map(|i| {
                    if depth == 0.0 {
                        f64::NAN
                    } else {
                        counts.get(i, j) / depth * target
                    }
                })
                .collect()
        })
        .collect();

    let mut data = DMatrix::zeros(n_features, n_samples);
    for (j, col) in normalized_cols.iter().enumerate() {
        for (i, &val) in col.iter().enumerate() {
            data[(i, j)] = val;
        }
    }

    debug!(
        "Normalized {} features x {} samples to column total {}",
        n_features, n_samples, target
    );

    Ok(DepthMatrix {
        data,
        feature_ids: counts.feature_ids().to_vec(),
        sample_ids: counts.sample_ids().to_vec(),
        target,
        depths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::scale;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    fn create_test_counts() -> CountMatrix {
        // 3 features × 4 samples, same composition at different depths
        let mut tri_mat = TriMat::new((3, 4));
        let depths = [100.0, 200.0, 50.0, 1000.0];
        for (j, &d) in depths.iter().enumerate() {
            tri_mat.add_triplet(0, j, 0.5 * d);
            tri_mat.add_triplet(1, j, 0.3 * d);
            tri_mat.add_triplet(2, j, 0.2 * d);
        }

        let feature_ids = vec!["A".into(), "B".into(), "C".into()];
        let sample_ids = vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()];
        CountMatrix::new(tri_mat.to_csr(), feature_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_cpm_values() {
        let counts = create_test_counts();
        let cpm = norm_depth(&counts, scale::CPM).unwrap();

        assert_eq!(cpm.n_features(), 3);
        assert_eq!(cpm.n_samples(), 4);
        for j in 0..4 {
            assert_relative_eq!(cpm.get(0, j), 500_000.0, max_relative = 1e-12);
            assert_relative_eq!(cpm.get(1, j), 300_000.0, max_relative = 1e-12);
            assert_relative_eq!(cpm.get(2, j), 200_000.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_column_sums_hit_target() {
        let counts = create_test_counts();
        for target in [scale::CPM, scale::PERCENT] {
            let norm = norm_depth(&counts, target).unwrap();
            for j in 0..norm.n_samples() {
                let col_sum: f64 = norm.col(j).iter().sum();
                assert_relative_eq!(col_sum, target, max_relative = SUM_TOLERANCE);
            }
            let check = norm.check();
            assert!(check.is_valid());
            assert_eq!(check.n_undefined(), 0);
            assert!(check.ensure_valid().is_ok());
        }
    }

    #[test]
    fn test_depths_recorded() {
        let counts = create_test_counts();
        let norm = norm_depth(&counts, scale::PERCENT).unwrap();
        assert_eq!(norm.depths, vec![100.0, 200.0, 50.0, 1000.0]);
    }

    #[test]
    fn test_serialize_metadata() {
        let counts = create_test_counts();
        let norm = norm_depth(&counts, scale::PERCENT).unwrap();
        let json = serde_json::to_value(&norm).unwrap();

        assert_eq!(json["target"], 100.0);
        assert_eq!(json["sample_ids"][3], "S4");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_zero_depth_column_is_nan() {
        let mut tri_mat = TriMat::new((2, 2));
        tri_mat.add_triplet(0, 0, 10.0);
        tri_mat.add_triplet(1, 0, 30.0);
        let counts = CountMatrix::new(
            tri_mat.to_csr(),
            vec!["A".into(), "B".into()],
            vec!["S1".into(), "S2".into()],
        )
        .unwrap();

        let norm = norm_depth(&counts, scale::CPM).unwrap();
        assert_relative_eq!(norm.get(0, 0), 250_000.0);
        assert!(norm.col(1).iter().all(|v| v.is_nan()));
        assert_eq!(norm.zero_depth_samples(), vec!["S2"]);

        let check = norm.check();
        assert!(check.is_valid());
        assert_eq!(check.n_undefined(), 1);
        assert_eq!(check.samples[1].status, CheckStatus::Undefined);
        let (lo, hi) = check.sum_range().unwrap();
        assert_relative_eq!(lo, 1_000_000.0, max_relative = 1e-12);
        assert_relative_eq!(hi, 1_000_000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_tampered_matrix_fails_check() {
        let counts = create_test_counts();
        let mut norm = norm_depth(&counts, scale::CPM).unwrap();
        norm.data[(0, 2)] += 10.0;

        let check = norm.check();
        assert!(!check.is_valid());
        assert_eq!(check.samples[2].status, CheckStatus::Failed);
        assert!(matches!(
            check.ensure_valid(),
            Err(ActivityError::NormalizationCheck(msg)) if msg.contains("S3")
        ));
    }

    #[test]
    fn test_empty_matrix() {
        let tri_mat: TriMat<f64> = TriMat::new((0, 0));
        let counts = CountMatrix::new(tri_mat.to_csr(), vec![], vec![]).unwrap();
        assert!(norm_depth(&counts, scale::CPM).is_err());
    }

    #[test]
    fn test_invalid_target() {
        let counts = create_test_counts();
        assert!(norm_depth(&counts, 0.0).is_err());
        assert!(norm_depth(&counts, -1.0).is_err());
        assert!(norm_depth(&counts, f64::INFINITY).is_err());
    }
}
