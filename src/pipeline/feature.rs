//! Mean-level run used for pathways and taxa.
//!
//! Each matrix is normalized on its own and averaged across all of its
//! samples; the ratio is then taken between the two means. No sample pairing
//! is needed.

use crate::aggregate::{summarize, NanPolicy};
use crate::align::{align_features, AlignmentSummary};
use crate::classify::{classify_quadrant, count_labels, ActivityTier, QuadrantLabel, Threshold};
use crate::config::ActivityConfig;
use crate::data::{CountMatrix, FeatureActivity, FeatureActivityTable};
use crate::error::{ActivityError, Result};
use crate::normalize::{norm_depth, DepthMatrix};
use crate::profile::{profile_depth, DepthProfile};
use crate::rank::{rank, Order, Statistic};
use crate::ratio::{activity_score, log_ratio};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Everything a mean-level run produces.
#[derive(Debug, Clone)]
pub struct FeatureReport {
    pub alignment: AlignmentSummary,
    pub genomic_depth: DepthProfile,
    pub activity_depth: DepthProfile,
    pub genomic_normalized: DepthMatrix,
    pub activity_normalized: DepthMatrix,
    pub table: FeatureActivityTable,
    /// Features dropped for lacking genomic signal.
    pub n_dropped: usize,
}

impl FeatureReport {
    /// The `n` highest (descending) or lowest (ascending) records by a statistic.
    pub fn top_by(&self, statistic: Statistic, order: Order, n: usize) -> Result<Vec<&FeatureActivity>> {
        Ok(rank(&self.table.records, statistic, order)?.top(n))
    }

    pub fn tier_counts(&self) -> BTreeMap<ActivityTier, usize> {
        count_labels(self.table.records.iter().map(|r| r.tier))
    }

    /// Quadrant counts; features without a quadrant are not counted.
    pub fn quadrant_counts(&self) -> BTreeMap<QuadrantLabel, usize> {
        count_labels(self.table.records.iter().filter_map(|r| r.quadrant))
    }
}

/// Compute mean-level activity from two normalized matrices.
///
/// Means skip NaN cells (zero-depth samples). With `require_genomic_signal`
/// only features whose mean genomic value is above zero are kept. Quadrant
/// thresholds are the medians of the two mean axes over the kept features.
pub fn feature_activity(
    genomic: &DepthMatrix,
    activity: &DepthMatrix,
    config: &ActivityConfig,
    require_genomic_signal: bool,
) -> Result<FeatureActivityTable> {
    config.validate_tiers()?;
    if genomic.feature_ids != activity.feature_ids {
        return Err(ActivityError::InvalidParameter(
            "Genomic and activity matrices are not aligned on the same features".to_string(),
        ));
    }

    let means: Vec<(f64, f64)> = (0..genomic.n_features())
        .into_par_iter()
        .map(|i| {
            (
                summarize(&genomic.row(i), NanPolicy::Skip).mean,
                summarize(&activity.row(i), NanPolicy::Skip).mean,
            )
        })
        .collect();

    let kept: Vec<usize> = (0..means.len())
        .filter(|&i| !require_genomic_signal || means[i].0 > 0.0)
        .collect();

    let genomic_axis: Vec<f64> = kept.iter().map(|&i| means[i].0).collect();
    let activity_axis: Vec<f64> = kept.iter().map(|&i| means[i].1).collect();
    let genomic_threshold = Threshold::Median.resolve(&genomic_axis).unwrap_or(f64::NAN);
    let activity_threshold = Threshold::Median.resolve(&activity_axis).unwrap_or(f64::NAN);

    let records = kept
        .iter()
        .map(|&i| {
            let (g, v) = means[i];
            let score = activity_score(v, g, config.pseudocount_ratio);
            FeatureActivity {
                feature_id: genomic.feature_ids[i].clone(),
                mean_genomic: g,
                mean_activity: v,
                log2_ratio: log_ratio(v, g, config.pseudocount_log),
                activity_score: score,
                quadrant: classify_quadrant(g, v, genomic_threshold, activity_threshold),
                tier: ActivityTier::from_score(score, config.threshold_high, config.threshold_low),
            }
        })
        .collect();

    Ok(FeatureActivityTable {
        genomic_threshold,
        activity_threshold,
        records,
    })
}

/// Align, normalize and compute mean-level activity.
pub fn run_features(
    genomic: &CountMatrix,
    activity: &CountMatrix,
    config: &ActivityConfig,
    require_genomic_signal: bool,
) -> Result<FeatureReport> {
    config.validate()?;

    let aligned = align_features(genomic, activity)?;
    let genomic_depth = profile_depth(&aligned.genomic);
    let activity_depth = profile_depth(&aligned.activity);

    let target = config.depth_normalization_target;
    let genomic_normalized = norm_depth(&aligned.genomic, target)?;
    let activity_normalized = norm_depth(&aligned.activity, target)?;
    genomic_normalized.check().ensure_valid()?;
    activity_normalized.check().ensure_valid()?;

    let table = feature_activity(
        &genomic_normalized,
        &activity_normalized,
        config,
        require_genomic_signal,
    )?;

    let n_dropped = aligned.summary.n_common - table.len();
    if n_dropped > 0 {
        warn!("{} features have no genomic signal and were dropped", n_dropped);
    }
    info!(
        "Feature activity for {} features (median genomic {:.4}, median activity {:.4})",
        table.len(),
        table.genomic_threshold,
        table.activity_threshold
    );

    Ok(FeatureReport {
        alignment: aligned.summary,
        genomic_depth,
        activity_depth,
        genomic_normalized,
        activity_normalized,
        table,
        n_dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn genomic() -> CountMatrix {
        CountMatrix::from_rows(
            &[
                vec![40.0, 60.0],
                vec![30.0, 20.0],
                vec![30.0, 20.0],
                vec![0.0, 0.0],
            ],
            vec!["taxA".into(), "taxB".into(), "taxC".into(), "taxD".into()],
            vec!["S1_MG".into(), "S2_MG".into()],
        )
        .unwrap()
    }

    fn activity() -> CountMatrix {
        CountMatrix::from_rows(
            &[
                vec![10.0, 10.0],
                vec![70.0, 70.0],
                vec![10.0, 10.0],
                vec![10.0, 10.0],
            ],
            vec!["taxA".into(), "taxB".into(), "taxC".into(), "taxD".into()],
            vec!["S1_MTX".into(), "S2_MTX".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_run_features_taxon() {
        let report = run_features(&genomic(), &activity(), &ActivityConfig::taxon(), false).unwrap();
        assert_eq!(report.table.len(), 4);
        assert_eq!(report.n_dropped, 0);

        // percent scale: genomic means A 50, B 25, C 25, D 0; activity A 10, B 70, C 10, D 10
        let b = &report.table.records[1];
        assert_relative_eq!(b.mean_genomic, 25.0, max_relative = 1e-12);
        assert_relative_eq!(b.mean_activity, 70.0, max_relative = 1e-12);
        assert_relative_eq!(b.activity_score, 70.0 / 25.01, max_relative = 1e-12);
        assert_relative_eq!(b.log2_ratio, (70.01f64 / 25.01).log2(), max_relative = 1e-12);
        assert_eq!(b.tier, ActivityTier::HighlyActive);

        let a = &report.table.records[0];
        assert_eq!(a.tier, ActivityTier::Dormant);

        // genomic 0, activity 10: score is large but finite
        let d = &report.table.records[3];
        assert_relative_eq!(d.activity_score, 1000.0, max_relative = 1e-12);
        assert!(d.log2_ratio.is_finite());

        // medians: genomic 25, activity 10
        assert_relative_eq!(report.table.genomic_threshold, 25.0, max_relative = 1e-12);
        assert_relative_eq!(report.table.activity_threshold, 10.0, max_relative = 1e-12);
        assert_eq!(a.quadrant, Some(QuadrantLabel::AbundantInactive));
        assert_eq!(b.quadrant, Some(QuadrantLabel::RareActive));
        assert_eq!(report.table.records[2].quadrant, Some(QuadrantLabel::RareInactive));
    }

    #[test]
    fn test_require_genomic_signal() {
        let report = run_features(&genomic(), &activity(), &ActivityConfig::gene(), true).unwrap();
        assert_eq!(report.table.len(), 3);
        assert_eq!(report.n_dropped, 1);
        assert!(report.table.iter().all(|r| r.feature_id != "taxD"));
    }

    #[test]
    fn test_inverted_tier_thresholds_rejected() {
        let config = ActivityConfig {
            threshold_high: 0.25,
            ..ActivityConfig::taxon()
        };
        assert!(matches!(
            run_features(&genomic(), &activity(), &config, false),
            Err(ActivityError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_top_by_and_counts() {
        let report = run_features(&genomic(), &activity(), &ActivityConfig::taxon(), false).unwrap();

        let most: Vec<&str> = report
            .top_by(Statistic::ActivityScore, Order::Descending, 2)
            .unwrap()
            .iter()
            .map(|r| r.feature_id.as_str())
            .collect();
        assert_eq!(most, vec!["taxD", "taxB"]);

        let tiers = report.tier_counts();
        assert_eq!(tiers.values().sum::<usize>(), 4);
        assert_eq!(report.quadrant_counts().values().sum::<usize>(), 4);
    }
}
