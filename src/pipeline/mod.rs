//! Analysis runs composed from the engine components.

mod bin;
mod feature;
mod gene;
mod runner;

pub use bin::run_bins;
pub use feature::{feature_activity, run_features, FeatureReport};
pub use gene::{run_gene, GeneReport, GeneRunSummary};
pub use runner::{Analysis, PairingSpec, Pipeline, PipelineConfig};
