//! Numeric policy shared by every component.
//!
//! All thresholds and pseudocounts live here and are passed explicitly into
//! the components that use them. Presets reproduce the constants of the
//! gene-, taxon- and bin-level analyses.

use crate::error::{ActivityError, Result};
use crate::normalize::scale;
use serde::{Deserialize, Serialize};

/// Numeric configuration for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Pseudocount `p` in `log2((v + p) / (g + p))`.
    pub pseudocount_log: f64,
    /// Additive `ε` in the raw activity score `v / (g + ε)`.
    pub pseudocount_ratio: f64,
    /// Column total after depth normalization (1e6 for CPM, 100 for percent).
    pub depth_normalization_target: f64,
    /// Over-active cut on the mean log-ratio, and the highly-active cut on the
    /// raw activity score.
    pub threshold_high: f64,
    /// Dormant cut on the raw activity score.
    pub threshold_low: f64,
    /// Bin relative-abundance threshold (percent).
    pub abundance_threshold: f64,
    /// Bin coverage threshold (percent).
    pub coverage_threshold: f64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self::gene()
    }
}

impl ActivityConfig {
    /// Gene- and pathway-level analysis on counts-per-million.
    pub fn gene() -> Self {
        Self {
            pseudocount_log: 1.0,
            pseudocount_ratio: 0.01,
            depth_normalization_target: scale::CPM,
            threshold_high: 2.0,
            threshold_low: 0.5,
            abundance_threshold: 5.0,
            coverage_threshold: 80.0,
        }
    }

    /// Taxon-level analysis on percentages.
    ///
    /// The log pseudocount shrinks with the scale so it stays small next to
    /// real percentages.
    pub fn taxon() -> Self {
        Self {
            pseudocount_log: 0.01,
            depth_normalization_target: scale::PERCENT,
            ..Self::gene()
        }
    }

    /// Genome-bin classification (relative abundance % vs coverage %).
    pub fn bin() -> Self {
        Self::taxon()
    }

    /// Look up a preset by name (`gene`, `pathway`, `taxon`, `bin`).
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gene" | "pathway" => Ok(Self::gene()),
            "taxon" => Ok(Self::taxon()),
            "bin" => Ok(Self::bin()),
            other => Err(ActivityError::InvalidParameter(format!(
                "Unknown preset '{}' (expected gene, pathway, taxon or bin)",
                other
            ))),
        }
    }

    /// Reject values that would break the stabilized formulas.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pseudocount_log", self.pseudocount_log),
            ("pseudocount_ratio", self.pseudocount_ratio),
            ("depth_normalization_target", self.depth_normalization_target),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ActivityError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        let finite = [
            ("threshold_high", self.threshold_high),
            ("threshold_low", self.threshold_low),
            ("abundance_threshold", self.abundance_threshold),
            ("coverage_threshold", self.coverage_threshold),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ActivityError::InvalidParameter(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Reject tier cuts that leave no room for the intermediate tier.
    ///
    /// Only the raw-score tiers read both thresholds on the same scale; the
    /// gene bands read `threshold_high` on the log-ratio alone.
    pub fn validate_tiers(&self) -> Result<()> {
        if self.threshold_low > self.threshold_high {
            return Err(ActivityError::InvalidParameter(format!(
                "threshold_low ({}) exceeds threshold_high ({}) on the activity score",
                self.threshold_low, self.threshold_high
            )));
        }
        Ok(())
    }

    /// Load from YAML string; missing fields take the gene preset values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ActivityError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let gene = ActivityConfig::gene();
        assert_eq!(gene.pseudocount_log, 1.0);
        assert_eq!(gene.depth_normalization_target, 1_000_000.0);

        let taxon = ActivityConfig::taxon();
        assert_eq!(taxon.pseudocount_log, 0.01);
        assert_eq!(taxon.pseudocount_ratio, 0.01);
        assert_eq!(taxon.depth_normalization_target, 100.0);
        assert_eq!(taxon.threshold_high, 2.0);
        assert_eq!(taxon.threshold_low, 0.5);

        let bin = ActivityConfig::bin();
        assert_eq!(bin.abundance_threshold, 5.0);
        assert_eq!(bin.coverage_threshold, 80.0);

        assert_eq!(ActivityConfig::default(), gene);
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(ActivityConfig::preset("Pathway").unwrap(), ActivityConfig::gene());
        assert_eq!(ActivityConfig::preset("taxon").unwrap(), ActivityConfig::taxon());
        assert!(ActivityConfig::preset("protein").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ActivityConfig::gene();
        config.pseudocount_log = 0.0;
        assert!(config.validate().is_err());

        let mut config = ActivityConfig::gene();
        config.depth_normalization_target = f64::NAN;
        assert!(config.validate().is_err());

        assert!(ActivityConfig::taxon().validate().is_ok());
    }

    #[test]
    fn test_high_threshold_below_low_is_valid() {
        // over-active cut on the log-ratio may sit below the dormant score cut
        let config = ActivityConfig {
            threshold_high: 0.25,
            ..ActivityConfig::gene()
        };
        assert!(config.validate().is_ok());
        assert!(ActivityConfig::from_yaml("threshold_high: 0.3\n").is_ok());

        assert!(matches!(
            config.validate_tiers(),
            Err(ActivityError::InvalidParameter(msg)) if msg.contains("activity score")
        ));
        assert!(ActivityConfig::taxon().validate_tiers().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = ActivityConfig::from_yaml("coverage_threshold: 70.0\n").unwrap();
        assert_eq!(config.coverage_threshold, 70.0);
        assert_eq!(config.pseudocount_log, 1.0);

        let yaml = config.to_yaml().unwrap();
        let reloaded = ActivityConfig::from_yaml(&yaml).unwrap();
        assert_eq!(reloaded, config);
    }
}
