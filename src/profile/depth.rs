//! Sequencing-depth profiling for count matrices.

use crate::aggregate::median;
use crate::data::CountMatrix;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Profile of per-sample totals in a count matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthProfile {
    /// Number of samples.
    pub n_samples: usize,
    /// Total per sample.
    pub depths: Vec<f64>,
    /// Mean depth.
    pub mean: f64,
    /// Median depth.
    pub median: f64,
    /// Population standard deviation of depths.
    pub std_dev: f64,
    /// Minimum depth.
    pub min: f64,
    /// Maximum depth.
    pub max: f64,
    /// Coefficient of variation (std_dev / mean).
    pub cv: f64,
    /// Samples with a total of zero (cannot be normalized).
    pub zero_depth_samples: Vec<String>,
}

impl DepthProfile {
    /// Check if depths are highly variable (CV > 0.5).
    pub fn is_highly_variable(&self) -> bool {
        self.cv > 0.5
    }

    /// Indices of samples with depth below a threshold.
    pub fn samples_below(&self, threshold: f64) -> Vec<usize> {
        self.depths
            .iter()
            .enumerate()
            .filter(|(_, &d)| d < threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl std::fmt::Display for DepthProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sequencing Depth Profile")?;
        writeln!(f, "  Samples: {}", self.n_samples)?;
        writeln!(f, "  Mean:    {:.0}", self.mean)?;
        writeln!(f, "  Median:  {:.0}", self.median)?;
        writeln!(f, "  Range:   {:.0} - {:.0}", self.min, self.max)?;
        writeln!(f, "  CV:      {:.2}", self.cv)?;
        if !self.zero_depth_samples.is_empty() {
            writeln!(f, "  Zero-depth samples: {}", self.zero_depth_samples.join(", "))?;
        }
        Ok(())
    }
}

/// Profile the per-sample totals of a count matrix.
pub fn profile_depth(counts: &CountMatrix) -> DepthProfile {
    let depths = counts.col_sums();
    let n_samples = depths.len();

    if n_samples == 0 {
        return DepthProfile {
            n_samples: 0,
            depths: vec![],
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            cv: 0.0,
            zero_depth_samples: vec![],
        };
    }

    let mean = depths.iter().mean();
    let std_dev = depths.iter().population_std_dev();
    let min = depths.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = depths.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };

    let zero_depth_samples = depths
        .iter()
        .zip(counts.sample_ids())
        .filter(|(&d, _)| d == 0.0)
        .map(|(_, id)| id.clone())
        .collect();

    DepthProfile {
        n_samples,
        median: median(&depths).unwrap_or(0.0),
        depths,
        mean,
        std_dev,
        min,
        max,
        cv,
        zero_depth_samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn create_test_matrix() -> CountMatrix {
        // 3 features × 4 samples with varying depth; sample 4 is empty
        let mut tri_mat = TriMat::new((3, 4));
        tri_mat.add_triplet(0, 0, 40.0);
        tri_mat.add_triplet(1, 0, 50.0);
        tri_mat.add_triplet(2, 0, 10.0);
        tri_mat.add_triplet(0, 1, 80.0);
        tri_mat.add_triplet(1, 1, 100.0);
        tri_mat.add_triplet(2, 1, 20.0);
        tri_mat.add_triplet(0, 2, 60.0);
        tri_mat.add_triplet(1, 2, 75.0);
        tri_mat.add_triplet(2, 2, 15.0);

        let feature_ids = vec!["A".into(), "B".into(), "C".into()];
        let sample_ids = vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()];
        CountMatrix::new(tri_mat.to_csr(), feature_ids, sample_ids).unwrap()
    }

    #[test]
    fn test_profile_depth() {
        let counts = create_test_matrix();
        let profile = profile_depth(&counts);

        assert_eq!(profile.n_samples, 4);
        assert_eq!(profile.depths, vec![100.0, 200.0, 150.0, 0.0]);
        assert_eq!(profile.min, 0.0);
        assert_eq!(profile.max, 200.0);
        assert!((profile.mean - 112.5).abs() < 1e-10);
        assert!((profile.median - 125.0).abs() < 1e-10);
        // population standard deviation of 100, 200, 150, 0
        let expected_sd = ((12.5f64.powi(2) + 87.5f64.powi(2) + 37.5f64.powi(2) + 112.5f64.powi(2)) / 4.0).sqrt();
        assert!((profile.std_dev - expected_sd).abs() < 1e-10);
        assert_eq!(profile.zero_depth_samples, vec!["S4".to_string()]);
    }

    #[test]
    fn test_samples_below_threshold() {
        let counts = create_test_matrix();
        let profile = profile_depth(&counts);
        assert_eq!(profile.samples_below(120.0), vec![0, 3]);
    }
}
