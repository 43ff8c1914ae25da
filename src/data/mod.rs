//! Data structures for paired abundance analysis.

mod count_matrix;
mod pairing;
mod result;

pub use count_matrix::CountMatrix;
pub use pairing::{ResolvedPair, SamplePair, SamplePairing};
pub use result::{ActivityRecord, ActivityTable, FeatureActivity, FeatureActivityTable, RATIO_SUFFIX};
