//! Depth normalization for paired count matrices.

pub mod depth;

pub use depth::{norm_depth, CheckStatus, DepthMatrix, NormalizationCheck, SampleCheck, SUM_TOLERANCE};

/// Common normalization targets.
pub mod scale {
    /// Counts per million (CPM).
    pub const CPM: f64 = 1_000_000.0;
    /// Percentages.
    pub const PERCENT: f64 = 100.0;
}
