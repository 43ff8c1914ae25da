//! Gene-level run: per-sample-pair log ratios aggregated per feature.

use super::runner::PairingSpec;
use crate::aggregate::{aggregate_ratios, summarize_table, NanPolicy, RatioSummary};
use crate::align::{align_features, AlignmentSummary};
use crate::config::ActivityConfig;
use crate::data::{ActivityRecord, ActivityTable, CountMatrix};
use crate::error::Result;
use crate::normalize::{norm_depth, DepthMatrix, NormalizationCheck};
use crate::profile::{profile_depth, DepthProfile};
use crate::rank::{rank, Order, Statistic};
use crate::ratio::compute_ratios;
use log::info;
use serde::Serialize;

/// Everything a gene-level run produces.
#[derive(Debug, Clone)]
pub struct GeneReport {
    pub alignment: AlignmentSummary,
    pub genomic_depth: DepthProfile,
    pub activity_depth: DepthProfile,
    pub genomic_normalized: DepthMatrix,
    pub activity_normalized: DepthMatrix,
    pub genomic_check: NormalizationCheck,
    pub activity_check: NormalizationCheck,
    pub table: ActivityTable,
    pub summary: RatioSummary,
}

/// Scalar summary of a gene-level run, suitable for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct GeneRunSummary<'a> {
    pub alignment: &'a AlignmentSummary,
    pub genomic_depth: &'a DepthProfile,
    pub activity_depth: &'a DepthProfile,
    pub pair_labels: &'a [String],
    pub ratios: &'a RatioSummary,
    pub n_highly_active: usize,
    pub n_under_active: usize,
}

impl GeneReport {
    /// Features whose mean log ratio exceeds the over-active threshold,
    /// most active first.
    pub fn highly_active(&self) -> Result<Vec<&ActivityRecord>> {
        let t = self.summary.threshold_high;
        let ranking = rank(&self.table.records, Statistic::MeanLog2Ratio, Order::Descending)?;
        Ok(ranking.filter(|m| m > t).iter().collect())
    }

    /// Features whose mean log ratio is below the negated threshold,
    /// least active first.
    pub fn under_active(&self) -> Result<Vec<&ActivityRecord>> {
        let t = -self.summary.threshold_high;
        let ranking = rank(&self.table.records, Statistic::MeanLog2Ratio, Order::Ascending)?;
        Ok(ranking.filter(|m| m < t).iter().collect())
    }

    pub fn run_summary(&self) -> Result<GeneRunSummary<'_>> {
        Ok(GeneRunSummary {
            alignment: &self.alignment,
            genomic_depth: &self.genomic_depth,
            activity_depth: &self.activity_depth,
            pair_labels: &self.table.pair_labels,
            ratios: &self.summary,
            n_highly_active: self.highly_active()?.len(),
            n_under_active: self.under_active()?.len(),
        })
    }
}

/// Align, normalize, pair, compute ratios and aggregate.
///
/// Stops at the first structural failure: an empty alignment, a pairing that
/// names a missing sample, or a normalized column that misses its target.
pub fn run_gene(
    genomic: &CountMatrix,
    activity: &CountMatrix,
    pairing: &PairingSpec,
    config: &ActivityConfig,
    nan_policy: NanPolicy,
) -> Result<GeneReport> {
    config.validate()?;

    let aligned = align_features(genomic, activity)?;

    let pairs = pairing
        .build(aligned.genomic.sample_ids())?
        .resolve(&aligned.genomic, &aligned.activity)?;
    info!("Resolved {} sample pairs", pairs.len());

    let genomic_depth = profile_depth(&aligned.genomic);
    let activity_depth = profile_depth(&aligned.activity);

    let target = config.depth_normalization_target;
    let genomic_normalized = norm_depth(&aligned.genomic, target)?;
    let activity_normalized = norm_depth(&aligned.activity, target)?;

    let genomic_check = genomic_normalized.check();
    genomic_check.ensure_valid()?;
    let activity_check = activity_normalized.check();
    activity_check.ensure_valid()?;

    let ratios = compute_ratios(
        &genomic_normalized,
        &activity_normalized,
        &pairs,
        config.pseudocount_log,
    )?;
    let table = aggregate_ratios(&ratios, nan_policy);
    let summary = summarize_table(&table, config.threshold_high);

    Ok(GeneReport {
        alignment: aligned.summary,
        genomic_depth,
        activity_depth,
        genomic_normalized,
        activity_normalized,
        genomic_check,
        activity_check,
        table,
        summary,
    })
}
