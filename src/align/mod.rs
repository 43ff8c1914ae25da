//! Feature alignment between a genomic and an activity matrix.
//!
//! Only features present in both matrices flow downstream. Both outputs are
//! restricted to the shared set with identical row order, taken from the
//! genomic matrix.

use crate::data::CountMatrix;
use crate::error::{ActivityError, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// Cardinalities reported by an alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentSummary {
    /// |A|: features in the genomic matrix.
    pub n_genomic: usize,
    /// |B|: features in the activity matrix.
    pub n_activity: usize,
    /// |C| = |A ∩ B|.
    pub n_common: usize,
    /// |A \ C|.
    pub n_genomic_only: usize,
    /// |B \ C|.
    pub n_activity_only: usize,
}

impl std::fmt::Display for AlignmentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Feature alignment")?;
        writeln!(f, "  Genomic features:  {}", self.n_genomic)?;
        writeln!(f, "  Activity features: {}", self.n_activity)?;
        writeln!(f, "  Common:            {}", self.n_common)?;
        writeln!(f, "  Genomic-only:      {}", self.n_genomic_only)?;
        writeln!(f, "  Activity-only:     {}", self.n_activity_only)?;
        Ok(())
    }
}

/// Two matrices restricted to their shared features.
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub genomic: CountMatrix,
    pub activity: CountMatrix,
    pub summary: AlignmentSummary,
}

/// Intersect the feature sets of two matrices.
///
/// Fails with [`ActivityError::EmptyAlignment`] when no feature is shared;
/// nothing downstream may run on an empty alignment. Inputs are not
/// modified.
pub fn align_features(genomic: &CountMatrix, activity: &CountMatrix) -> Result<AlignedPair> {
    let activity_index = activity.feature_index();

    let (genomic_rows, activity_rows): (Vec<usize>, Vec<usize>) = genomic
        .feature_ids()
        .iter()
        .enumerate()
        .filter_map(|(row, id)| activity_index.get(id.as_str()).map(|&other| (row, other)))
        .unzip();

    let n_common = genomic_rows.len();
    let summary = AlignmentSummary {
        n_genomic: genomic.n_features(),
        n_activity: activity.n_features(),
        n_common,
        n_genomic_only: genomic.n_features() - n_common,
        n_activity_only: activity.n_features() - n_common,
    };

    if n_common == 0 {
        return Err(ActivityError::EmptyAlignment {
            n_genomic: summary.n_genomic,
            n_activity: summary.n_activity,
        });
    }

    info!(
        "Aligned {} common features ({} genomic-only, {} activity-only)",
        summary.n_common, summary.n_genomic_only, summary.n_activity_only
    );

    Ok(AlignedPair {
        genomic: genomic.subset_features(&genomic_rows)?,
        activity: activity.subset_features(&activity_rows)?,
        summary,
    })
}
