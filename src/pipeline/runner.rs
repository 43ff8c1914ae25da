//! Run configuration and the pipeline builder.

use super::bin::run_bins;
use super::feature::{run_features, FeatureReport};
use super::gene::{run_gene, GeneReport};
use crate::aggregate::NanPolicy;
use crate::combine::{CombinedTable, SourceTable};
use crate::config::ActivityConfig;
use crate::data::{CountMatrix, SamplePair, SamplePairing};
use crate::error::{ActivityError, Result};
use serde::{Deserialize, Serialize};

/// How genomic samples are paired with activity samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairingSpec {
    /// Replace a token in the genomic id, e.g. `MG` -> `MTX`.
    Substitution { from: String, to: String },
    /// Regex replacement applied to genomic ids that match.
    Pattern { pattern: String, replacement: String },
    /// An explicit table of pairs.
    Explicit { pairs: Vec<SamplePair> },
}

impl Default for PairingSpec {
    fn default() -> Self {
        Self::Substitution {
            from: "MG".to_string(),
            to: "MTX".to_string(),
        }
    }
}

impl PairingSpec {
    /// Build the pairing table for a set of genomic sample ids.
    pub fn build(&self, genomic_ids: &[String]) -> Result<SamplePairing> {
        match self {
            Self::Substitution { from, to } => SamplePairing::from_substitution(genomic_ids, from, to),
            Self::Pattern {
                pattern,
                replacement,
            } => SamplePairing::from_pattern(genomic_ids, pattern, replacement),
            Self::Explicit { pairs } => Ok(SamplePairing::from_sample_pairs(pairs.clone())),
        }
    }
}

/// Which analysis a pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Analysis {
    /// Per-sample-pair log ratios aggregated per feature.
    Gene {
        #[serde(default)]
        pairing: PairingSpec,
        #[serde(default)]
        nan_policy: NanPolicy,
    },
    /// Ratio of the across-sample means (pathway and taxon analyses).
    Feature {
        /// Drop features whose mean genomic value is zero.
        #[serde(default)]
        require_genomic_signal: bool,
    },
    /// Outer join of bin abundance and bin coverage.
    Bin,
}

impl Analysis {
    fn kind(&self) -> &'static str {
        match self {
            Self::Gene { .. } => "gene",
            Self::Feature { .. } => "feature",
            Self::Bin => "bin",
        }
    }
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Analysis to run.
    pub analysis: Analysis,
    /// Numeric policy.
    #[serde(default)]
    pub config: ActivityConfig,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ActivityError::from)
    }
}

/// Builder for configuring and running one analysis.
///
/// # Example
/// ```ignore
/// let report = Pipeline::gene()
///     .name("gut-mtx")
///     .config(ActivityConfig::gene())
///     .pairing(PairingSpec::Substitution { from: "MG".into(), to: "MTX".into() })
///     .run_gene(&genomic, &activity)?;
/// println!("{}", report.summary);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    analysis: Analysis,
    config: ActivityConfig,
}

impl Pipeline {
    /// Gene-level pipeline with the gene preset and `MG` -> `MTX` pairing.
    pub fn gene() -> Self {
        Self {
            name: "gene".to_string(),
            analysis: Analysis::Gene {
                pairing: PairingSpec::default(),
                nan_policy: NanPolicy::default(),
            },
            config: ActivityConfig::gene(),
        }
    }

    /// Mean-level pipeline (pathways with the gene preset).
    pub fn features() -> Self {
        Self {
            name: "feature".to_string(),
            analysis: Analysis::Feature {
                require_genomic_signal: false,
            },
            config: ActivityConfig::gene(),
        }
    }

    /// Bin-level pipeline with the bin preset.
    pub fn bins() -> Self {
        Self {
            name: "bin".to_string(),
            analysis: Analysis::Bin,
            config: ActivityConfig::bin(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            name: config.name.clone(),
            analysis: config.analysis.clone(),
            config: config.config,
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Replace the numeric configuration.
    pub fn config(mut self, config: ActivityConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the sample pairing; only meaningful for gene pipelines.
    pub fn pairing(mut self, spec: PairingSpec) -> Self {
        if let Analysis::Gene { pairing, .. } = &mut self.analysis {
            *pairing = spec;
        }
        self
    }

    /// Set how undefined ratios enter the per-feature summary.
    pub fn nan_policy(mut self, policy: NanPolicy) -> Self {
        if let Analysis::Gene { nan_policy, .. } = &mut self.analysis {
            *nan_policy = policy;
        }
        self
    }

    /// Drop features without genomic signal; only meaningful for feature pipelines.
    pub fn require_genomic_signal(mut self, require: bool) -> Self {
        if let Analysis::Feature {
            require_genomic_signal,
        } = &mut self.analysis
        {
            *require_genomic_signal = require;
        }
        self
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn activity_config(&self) -> &ActivityConfig {
        &self.config
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            analysis: self.analysis.clone(),
            config: self.config,
        }
    }

    fn wrong_analysis(&self, expected: &str) -> ActivityError {
        ActivityError::Pipeline(format!(
            "Pipeline '{}' is configured for {} analysis, not {}",
            self.name,
            self.analysis.kind(),
            expected
        ))
    }

    /// Run the gene-level analysis.
    pub fn run_gene(&self, genomic: &CountMatrix, activity: &CountMatrix) -> Result<GeneReport> {
        match &self.analysis {
            Analysis::Gene {
                pairing,
                nan_policy,
            } => run_gene(genomic, activity, pairing, &self.config, *nan_policy),
            _ => Err(self.wrong_analysis("gene")),
        }
    }

    /// Run the mean-level (pathway / taxon) analysis.
    pub fn run_features(&self, genomic: &CountMatrix, activity: &CountMatrix) -> Result<FeatureReport> {
        match &self.analysis {
            Analysis::Feature {
                require_genomic_signal,
            } => run_features(genomic, activity, &self.config, *require_genomic_signal),
            _ => Err(self.wrong_analysis("feature")),
        }
    }

    /// Run the bin-level join and classification.
    pub fn run_bins(&self, abundance: &SourceTable, coverage: &SourceTable) -> Result<CombinedTable> {
        match &self.analysis {
            Analysis::Bin => run_bins(abundance, coverage, &self.config),
            _ => Err(self.wrong_analysis("bin")),
        }
    }
}
