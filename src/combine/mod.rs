//! Outer join of two independently sourced per-bin tables.
//!
//! Genome bins are measured twice: relative abundance (%) from one tool and
//! coverage (%) from another. The tables are joined on bin id keeping every
//! bin from either side. A bin missing from one side keeps `None` for that
//! side and is labeled [`CombinedLabel::Incomplete`]; absence is never
//! imputed as zero.

use crate::classify::{classify_combined, count_labels, CombinedLabel};
use crate::data::CountMatrix;
use crate::error::{ActivityError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Suffix of relative-abundance columns.
pub const ABUNDANCE_SUFFIX: &str = "_RA";
/// Suffix of coverage columns.
pub const COVERAGE_SUFFIX: &str = "_Cov";

/// A per-bin table whose cells may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    pub ids: Vec<String>,
    pub samples: Vec<String>,
    /// `values[row][col]`; `None` when the source reported nothing.
    pub values: Vec<Vec<Option<f64>>>,
}

impl SourceTable {
    /// Wrap a complete matrix; every cell is present.
    pub fn from_matrix(matrix: &CountMatrix) -> Self {
        Self {
            ids: matrix.feature_ids().to_vec(),
            samples: matrix.sample_ids().to_vec(),
            values: (0..matrix.n_features())
                .map(|i| matrix.row_dense(i).into_iter().map(Some).collect())
                .collect(),
        }
    }

    /// Pivot long-format `(id, sample, value)` records.
    ///
    /// Repeated (id, sample) records are averaged. Ids and samples come out
    /// sorted; combinations never reported stay `None`.
    pub fn from_long<I, S>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: Into<String>,
    {
        let mut cells: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
        for (id, sample, value) in records {
            if !value.is_finite() {
                return Err(ActivityError::InvalidParameter(format!(
                    "Non-finite value {} in long-format table",
                    value
                )));
            }
            let cell = cells.entry((id.into(), sample.into())).or_insert((0.0, 0));
            cell.0 += value;
            cell.1 += 1;
        }

        let ids: Vec<String> = cells
            .keys()
            .map(|(id, _)| id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let samples: Vec<String> = cells
            .keys()
            .map(|(_, s)| s.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let sample_index: HashMap<&str, usize> =
            samples.iter().enumerate().map(|(j, s)| (s.as_str(), j)).collect();
        let id_index: HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();

        let mut values = vec![vec![None; samples.len()]; ids.len()];
        for ((id, sample), (sum, n)) in &cells {
            values[id_index[id.as_str()]][sample_index[sample.as_str()]] = Some(sum / *n as f64);
        }

        Ok(Self { ids, samples, values })
    }

    /// Read a long-format, tab-separated file with the named columns.
    pub fn from_long_tsv<P: AsRef<Path>>(
        path: P,
        id_column: &str,
        sample_column: &str,
        value_column: &str,
    ) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)?;

        let header = rdr.headers()?.clone();
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ActivityError::InvalidParameter(format!("Missing column '{}'", name)))
        };
        let (id_col, sample_col, value_col) = (find(id_column)?, find(sample_column)?, find(value_column)?);

        let mut records = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let field = |col: usize| record.get(col).unwrap_or("").trim().to_string();
            let raw = field(value_col);
            let value: f64 = raw.parse().map_err(|_| ActivityError::InvalidValue {
                value: raw.clone(),
                row,
                col: value_col,
            })?;
            records.push((field(id_col), field(sample_col), value));
        }

        Self::from_long(records)
    }

    /// Mean over the present, non-NaN cells of a row; `None` if there are none.
    pub fn row_mean(&self, row: usize) -> Option<f64> {
        mean_of(self.values[row].iter().flatten().copied().filter(|v| !v.is_nan()))
    }

    fn index(&self) -> HashMap<&str, usize> {
        self.ids.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect()
    }
}

/// One bin after the outer join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub bin_id: String,
    /// Abundance per abundance sample; all `None` if absent from that source.
    pub abundance: Vec<Option<f64>>,
    /// Coverage per coverage sample; all `None` if absent from that source.
    pub coverage: Vec<Option<f64>>,
    pub mean_abundance: Option<f64>,
    pub mean_coverage: Option<f64>,
    pub label: CombinedLabel,
}

/// Membership counts of the join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSummary {
    pub total: usize,
    pub in_both: usize,
    pub only_abundance: usize,
    pub only_coverage: usize,
}

/// Result of joining and classifying two bin tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedTable {
    pub abundance_samples: Vec<String>,
    pub coverage_samples: Vec<String>,
    pub abundance_threshold: f64,
    pub coverage_threshold: f64,
    pub records: Vec<CombinedRecord>,
    pub summary: JoinSummary,
}

impl CombinedTable {
    /// Number of bins per label; labels with no bins are omitted.
    pub fn label_counts(&self) -> BTreeMap<CombinedLabel, usize> {
        count_labels(self.records.iter().map(|r| r.label))
    }

    /// Records carrying a given label, in table order.
    pub fn with_label(&self, label: CombinedLabel) -> Vec<&CombinedRecord> {
        self.records.iter().filter(|r| r.label == label).collect()
    }

    /// Mean of the per-bin mean abundance over bins that have one.
    pub fn overall_mean_abundance(&self) -> Option<f64> {
        mean_of(self.records.iter().filter_map(|r| r.mean_abundance))
    }

    /// Mean of the per-bin mean coverage over bins that have one.
    pub fn overall_mean_coverage(&self) -> Option<f64> {
        mean_of(self.records.iter().filter_map(|r| r.mean_coverage))
    }

    /// Column headers for TSV output.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["bin_id".to_string()];
        header.extend(self.abundance_samples.iter().map(|s| format!("{}{}", s, ABUNDANCE_SUFFIX)));
        header.extend(self.coverage_samples.iter().map(|s| format!("{}{}", s, COVERAGE_SUFFIX)));
        header.extend(["Mean_RA", "Mean_Cov", "Classification"].map(String::from));
        header
    }

    /// Write the whole table to TSV; missing cells are written as `NA`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_records(path, self.records.iter())
    }

    /// Write a selection of records to TSV.
    pub fn write_records<'a, P, I>(&self, path: P, records: I) -> Result<()>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = &'a CombinedRecord>,
    {
        let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_else(|| "NA".to_string());

        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", self.header().join("\t"))?;
        for r in records {
            write!(writer, "{}", r.bin_id)?;
            for &v in r.abundance.iter().chain(&r.coverage) {
                write!(writer, "\t{}", cell(v))?;
            }
            writeln!(
                writer,
                "\t{}\t{}\t{}",
                cell(r.mean_abundance),
                cell(r.mean_coverage),
                r.label.name()
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Display for CombinedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Combined abundance and coverage summary")?;
        writeln!(f, "  Total bins: {}", self.summary.total)?;
        writeln!(f, "  In both sources:    {}", self.summary.in_both)?;
        writeln!(f, "  Only abundance:     {}", self.summary.only_abundance)?;
        writeln!(f, "  Only coverage:      {}", self.summary.only_coverage)?;
        writeln!(f, "Classification:")?;
        for (label, count) in self.label_counts() {
            let pct = count as f64 / self.summary.total.max(1) as f64 * 100.0;
            writeln!(f, "  {}: {} ({:.1}%)", label.name(), count, pct)?;
        }
        if let Some(m) = self.overall_mean_abundance() {
            writeln!(f, "  Mean relative abundance: {:.2}%", m)?;
        }
        if let Some(m) = self.overall_mean_coverage() {
            writeln!(f, "  Mean coverage: {:.2}%", m)?;
        }
        Ok(())
    }
}

fn mean_of<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}

/// Outer-join two bin tables and classify every bin.
///
/// Output bins are sorted by id. Per-bin means skip missing cells; a bin with
/// no value on one side has `None` there and is labeled incomplete.
pub fn combine_sources(
    abundance: &SourceTable,
    coverage: &SourceTable,
    abundance_threshold: f64,
    coverage_threshold: f64,
) -> CombinedTable {
    let abundance_index = abundance.index();
    let coverage_index = coverage.index();

    let all_ids: BTreeSet<&str> = abundance
        .ids
        .iter()
        .chain(&coverage.ids)
        .map(String::as_str)
        .collect();

    let mut summary = JoinSummary {
        total: all_ids.len(),
        ..JoinSummary::default()
    };

    let records: Vec<CombinedRecord> = all_ids
        .into_iter()
        .map(|id| {
            let a_row = abundance_index.get(id).copied();
            let c_row = coverage_index.get(id).copied();
            match (a_row, c_row) {
                (Some(_), Some(_)) => summary.in_both += 1,
                (Some(_), None) => summary.only_abundance += 1,
                (None, Some(_)) => summary.only_coverage += 1,
                (None, None) => {}
            }

            let abundance_values = match a_row {
                Some(i) => abundance.values[i].clone(),
                None => vec![None; abundance.samples.len()],
            };
            let coverage_values = match c_row {
                Some(i) => coverage.values[i].clone(),
                None => vec![None; coverage.samples.len()],
            };
            let mean_abundance = a_row.and_then(|i| abundance.row_mean(i));
            let mean_coverage = c_row.and_then(|i| coverage.row_mean(i));

            CombinedRecord {
                bin_id: id.to_string(),
                abundance: abundance_values,
                coverage: coverage_values,
                mean_abundance,
                mean_coverage,
                label: classify_combined(
                    mean_abundance,
                    mean_coverage,
                    abundance_threshold,
                    coverage_threshold,
                ),
            }
        })
        .collect();

    info!(
        "Combined {} bins: {} in both, {} only abundance, {} only coverage",
        summary.total, summary.in_both, summary.only_abundance, summary.only_coverage
    );
    let n_incomplete = records
        .iter()
        .filter(|r| r.label == CombinedLabel::Incomplete)
        .count();
    if n_incomplete > 0 {
        warn!("{} bins lack data from one source and are labeled incomplete", n_incomplete);
    }

    CombinedTable {
        abundance_samples: abundance.samples.clone(),
        coverage_samples: coverage.samples.clone(),
        abundance_threshold,
        coverage_threshold,
        records,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn abundance() -> SourceTable {
        let matrix = CountMatrix::from_rows(
            &[vec![10.0, 6.0], vec![1.0, 2.0], vec![7.0, 3.0]],
            vec!["bin_1".into(), "bin_2".into(), "bin_3".into()],
            vec!["S1".into(), "S2".into()],
        )
        .unwrap();
        SourceTable::from_matrix(&matrix)
    }

    fn coverage() -> SourceTable {
        SourceTable::from_long(vec![
            ("bin_1", "S1", 90.0),
            ("bin_1", "S2", 100.0),
            ("bin_2", "S1", 85.0),
            ("bin_3", "S1", 40.0),
            ("bin_3", "S1", 60.0),
            ("bin_4", "S2", 99.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_long_pivot() {
        let cov = coverage();
        assert_eq!(cov.ids, vec!["bin_1", "bin_2", "bin_3", "bin_4"]);
        assert_eq!(cov.samples, vec!["S1", "S2"]);
        assert_eq!(cov.values[2], vec![Some(50.0), None]);
        assert_eq!(cov.values[3], vec![None, Some(99.0)]);
        assert_eq!(cov.row_mean(1), Some(85.0));
    }

    #[test]
    fn test_from_long_tsv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tgenome\tcoverage\ttaxonomy").unwrap();
        writeln!(file, "S1\tbin_1\t80.5\tx").unwrap();
        writeln!(file, "S2\tbin_1\t70.5\tx").unwrap();
        file.flush().unwrap();

        let table = SourceTable::from_long_tsv(file.path(), "genome", "sample", "coverage").unwrap();
        assert_eq!(table.ids, vec!["bin_1"]);
        assert_relative_eq!(table.row_mean(0).unwrap(), 75.5);

        assert!(SourceTable::from_long_tsv(file.path(), "bin", "sample", "coverage").is_err());
    }

    #[test]
    fn test_combine_labels() {
        let table = combine_sources(&abundance(), &coverage(), 5.0, 80.0);

        assert_eq!(
            table.summary,
            JoinSummary {
                total: 4,
                in_both: 3,
                only_abundance: 0,
                only_coverage: 1,
            }
        );

        let labels: Vec<(&str, CombinedLabel)> =
            table.records.iter().map(|r| (r.bin_id.as_str(), r.label)).collect();
        assert_eq!(
            labels,
            vec![
                // mean RA 8, mean cov 95
                ("bin_1", CombinedLabel::HighHigh),
                // mean RA 1.5, mean cov 85
                ("bin_2", CombinedLabel::LowHigh),
                // mean RA 5 (not > 5), mean cov 50
                ("bin_3", CombinedLabel::LowLow),
                // no abundance at all
                ("bin_4", CombinedLabel::Incomplete),
            ]
        );

        let bin_4 = &table.records[3];
        assert_eq!(bin_4.mean_abundance, None);
        assert_eq!(bin_4.abundance, vec![None, None]);
        assert_eq!(bin_4.mean_coverage, Some(99.0));
    }

    #[test]
    fn test_label_counts_and_means() {
        let table = combine_sources(&abundance(), &coverage(), 5.0, 80.0);
        let counts = table.label_counts();
        assert_eq!(counts.values().sum::<usize>(), 4);
        assert_eq!(counts[&CombinedLabel::Incomplete], 1);
        assert_eq!(table.with_label(CombinedLabel::LowHigh).len(), 1);
        assert_relative_eq!(
            table.overall_mean_abundance().unwrap(),
            (8.0 + 1.5 + 5.0) / 3.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_combined_tsv() {
        let table = combine_sources(&abundance(), &coverage(), 5.0, 80.0);
        let file = NamedTempFile::new().unwrap();
        table.to_tsv(file.path()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "bin_id\tS1_RA\tS2_RA\tS1_Cov\tS2_Cov\tMean_RA\tMean_Cov\tClassification"
        );
        assert_eq!(lines[4], "bin_4\tNA\tNA\tNA\t99\tNA\t99\tIncomplete_Data");
    }
}
