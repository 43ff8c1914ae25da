//! Result tables produced by the activity engine.
//!
//! Tables are built once and not mutated afterwards; ranking and filtering
//! produce borrowed views over the records.
//!
//! Column names carry their role as a suffix so downstream tools can select
//! every column of one kind: `<pair>_log2_ratio` for per-sample ratios,
//! `Mean_*` for summaries.

use crate::classify::{ActivityTier, QuadrantLabel};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Suffix of per-sample-pair log-ratio columns.
pub const RATIO_SUFFIX: &str = "_log2_ratio";

/// Per-feature result of the per-sample ratio pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub feature_id: String,
    /// One log2 ratio per sample pair, in pair order.
    pub ratios: Vec<f64>,
    /// Mean over the defined ratios.
    pub mean_log2_ratio: f64,
    /// Sample standard deviation over the defined ratios.
    pub std_dev: f64,
    /// Number of ratios that entered the summary.
    pub n_defined: usize,
}

/// Activity records for all aligned features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTable {
    /// Sample-pair labels, one per ratio column.
    pub pair_labels: Vec<String>,
    /// Log pseudocount used for the ratios.
    pub pseudocount: f64,
    pub records: Vec<ActivityRecord>,
}

impl ActivityTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.records.iter()
    }

    /// Look up a record by feature id.
    pub fn get(&self, feature_id: &str) -> Option<&ActivityRecord> {
        self.records.iter().find(|r| r.feature_id == feature_id)
    }

    /// Column headers for TSV output.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["feature_id".to_string()];
        header.extend(self.pair_labels.iter().map(|l| format!("{}{}", l, RATIO_SUFFIX)));
        header.push("Mean_Log2_Ratio".to_string());
        header.push("StdDev".to_string());
        header
    }

    /// Write the full table to TSV.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_records(path, self.records.iter())
    }

    /// Write a selection of this table's records (e.g. a ranked view) to TSV.
    pub fn write_records<'a, P, I>(&self, path: P, records: I) -> Result<()>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = &'a ActivityRecord>,
    {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", self.header().join("\t"))?;

        for r in records {
            write!(writer, "{}", r.feature_id)?;
            for v in &r.ratios {
                write!(writer, "\t{}", v)?;
            }
            writeln!(writer, "\t{}\t{}", r.mean_log2_ratio, r.std_dev)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Per-feature result of the mean-level (pathway / taxon) variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureActivity {
    pub feature_id: String,
    /// Mean normalized genomic value across samples.
    pub mean_genomic: f64,
    /// Mean normalized activity value across samples.
    pub mean_activity: f64,
    /// `log2((v̄ + p) / (ḡ + p))`.
    pub log2_ratio: f64,
    /// `v̄ / (ḡ + ε)`.
    pub activity_score: f64,
    /// Quadrant on the (mean genomic, mean activity) plane.
    pub quadrant: Option<QuadrantLabel>,
    pub tier: ActivityTier,
}

/// Mean-level activity for all retained features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureActivityTable {
    /// Threshold used on the genomic axis of the quadrant.
    pub genomic_threshold: f64,
    /// Threshold used on the activity axis of the quadrant.
    pub activity_threshold: f64,
    pub records: Vec<FeatureActivity>,
}

impl FeatureActivityTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureActivity> {
        self.records.iter()
    }

    /// Write the full table to TSV.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Self::write_records(path, self.records.iter())
    }

    /// Write a selection of records to TSV.
    pub fn write_records<'a, P, I>(path: P, records: I) -> Result<()>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = &'a FeatureActivity>,
    {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(
            writer,
            "feature_id\tMean_Genomic\tMean_Activity\tActivity_Score\tLog2_Ratio\tQuadrant\tActivity_Tier"
        )?;
        for r in records {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                r.feature_id,
                r.mean_genomic,
                r.mean_activity,
                r.activity_score,
                r.log2_ratio,
                r.quadrant.map(|q| q.name()).unwrap_or("NA"),
                r.tier.name()
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    fn table() -> ActivityTable {
        ActivityTable {
            pair_labels: vec!["S1".into(), "S2".into()],
            pseudocount: 1.0,
            records: vec![
                ActivityRecord {
                    feature_id: "g1".into(),
                    ratios: vec![1.0, 3.0],
                    mean_log2_ratio: 2.0,
                    std_dev: 2.0f64.sqrt(),
                    n_defined: 2,
                },
                ActivityRecord {
                    feature_id: "g2".into(),
                    ratios: vec![f64::NAN, -1.0],
                    mean_log2_ratio: -1.0,
                    std_dev: 0.0,
                    n_defined: 1,
                },
            ],
        }
    }

    #[test]
    fn test_header_roles() {
        let header = table().header();
        assert_eq!(
            header,
            vec!["feature_id", "S1_log2_ratio", "S2_log2_ratio", "Mean_Log2_Ratio", "StdDev"]
        );
        assert_eq!(header.iter().filter(|h| h.ends_with(RATIO_SUFFIX)).count(), 2);
    }

    #[test]
    fn test_write_tsv() {
        let table = table();
        let file = NamedTempFile::new().unwrap();
        table.to_tsv(file.path()).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("g1\t1\t3\t2\t"));
        assert_eq!(lines[2], "g2\tNaN\t-1\t-1\t0");
    }

    #[test]
    fn test_lookup() {
        let table = table();
        assert_eq!(table.get("g2").map(|r| r.n_defined), Some(1));
        assert!(table.get("g3").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_feature_table_tsv() {
        let table = FeatureActivityTable {
            genomic_threshold: 1.0,
            activity_threshold: 1.0,
            records: vec![FeatureActivity {
                feature_id: "tax1".into(),
                mean_genomic: 2.0,
                mean_activity: 0.5,
                log2_ratio: -2.0,
                activity_score: 0.25,
                quadrant: Some(QuadrantLabel::AbundantInactive),
                tier: ActivityTier::Dormant,
            }],
        };
        let file = NamedTempFile::new().unwrap();
        table.to_tsv(file.path()).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("tax1\t2\t0.5\t0.25\t-2\tAbundant_Inactive\tdormant"));
    }
}
