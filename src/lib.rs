//! Composable Activity Library
//!
//! This library quantifies how active a biological feature is relative to
//! its genomic abundance, from paired count tables such as metagenomic (DNA)
//! and metatranscriptomic (RNA) profiles, or genome-bin abundance and
//! coverage.
//!
//! # Overview
//!
//! Data flows strictly through these modules:
//!
//! - **data**: Core data structures (CountMatrix, SamplePairing, result tables)
//! - **align**: Feature alignment on shared identifiers
//! - **profile**: Sequencing-depth profiling
//! - **normalize**: Depth normalization (CPM / percent) with a self-check
//! - **ratio**: Stabilized log2 ratio and raw activity score
//! - **aggregate**: Per-feature mean and dispersion, activity bands
//! - **classify**: Quadrant, combined-source and tier labels
//! - **combine**: Outer join of bin abundance and coverage
//! - **rank**: Stable ranking and top-N / bottom-N views
//! - **pipeline**: Gene-, feature- and bin-level runs
//!
//! # Example
//!
//! ```no_run
//! use composable_activity::prelude::*;
//!
//! let genomic = CountMatrix::from_delimited("mg_counts.tsv").unwrap();
//! let activity = CountMatrix::from_delimited("mtx_counts.tsv").unwrap();
//!
//! let report = Pipeline::gene()
//!     .name("gene-activity")
//!     .config(ActivityConfig::gene())
//!     .run_gene(&genomic, &activity)
//!     .unwrap();
//!
//! println!("{}", report.summary);
//! for record in report.highly_active().unwrap().iter().take(10) {
//!     println!("{}\t{:.2}", record.feature_id, record.mean_log2_ratio);
//! }
//! ```

pub mod aggregate;
pub mod align;
pub mod classify;
pub mod combine;
pub mod config;
pub mod data;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod rank;
pub mod ratio;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aggregate::{
        aggregate_ratios, band_counts, median, summarize, summarize_table, ActivityBand,
        BandCounts, NanPolicy, RatioSummary, Summary,
    };
    pub use crate::align::{align_features, AlignedPair, AlignmentSummary};
    pub use crate::classify::{
        classify_combined, classify_quadrant, count_labels, ActivityTier, CombinedLabel,
        QuadrantLabel, Threshold,
    };
    pub use crate::combine::{combine_sources, CombinedRecord, CombinedTable, JoinSummary, SourceTable};
    pub use crate::config::ActivityConfig;
    pub use crate::data::{
        ActivityRecord, ActivityTable, CountMatrix, FeatureActivity, FeatureActivityTable,
        ResolvedPair, SamplePair, SamplePairing,
    };
    pub use crate::error::{ActivityError, Result};
    pub use crate::normalize::{norm_depth, scale, DepthMatrix, NormalizationCheck};
    pub use crate::pipeline::{
        feature_activity, run_bins, run_features, run_gene, Analysis, FeatureReport,
        GeneReport, PairingSpec, Pipeline, PipelineConfig,
    };
    pub use crate::profile::{profile_depth, DepthProfile};
    pub use crate::rank::{rank, Order, Ranked, Ranking, Statistic};
    pub use crate::ratio::{activity_score, compute_ratios, log_ratio, RatioMatrix};
}
