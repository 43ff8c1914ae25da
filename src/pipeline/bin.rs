//! Bin-level run: join abundance with coverage and classify.

use crate::combine::{combine_sources, CombinedTable, SourceTable};
use crate::config::ActivityConfig;
use crate::error::{ActivityError, Result};

/// Join two bin tables and label every bin.
///
/// Fails only when both tables are empty; a bin missing from one side is
/// labeled incomplete, not rejected.
pub fn run_bins(
    abundance: &SourceTable,
    coverage: &SourceTable,
    config: &ActivityConfig,
) -> Result<CombinedTable> {
    config.validate()?;
    if abundance.ids.is_empty() && coverage.ids.is_empty() {
        return Err(ActivityError::EmptyData(
            "Neither the abundance nor the coverage table contains any bin".to_string(),
        ));
    }
    Ok(combine_sources(
        abundance,
        coverage,
        config.abundance_threshold,
        config.coverage_threshold,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CombinedLabel;

    #[test]
    fn test_run_bins() {
        let abundance = SourceTable::from_long(vec![("bin_1", "S1", 12.0), ("bin_2", "S1", 0.5)]).unwrap();
        let coverage = SourceTable::from_long(vec![("bin_1", "S1", 95.0), ("bin_3", "S1", 60.0)]).unwrap();

        let table = run_bins(&abundance, &coverage, &ActivityConfig::bin()).unwrap();
        let labels: Vec<CombinedLabel> = table.records.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec![
                CombinedLabel::HighHigh,
                CombinedLabel::Incomplete,
                CombinedLabel::Incomplete,
            ]
        );
        assert_eq!(table.summary.only_abundance, 1);
        assert_eq!(table.summary.only_coverage, 1);
    }

    #[test]
    fn test_run_bins_empty() {
        let empty = SourceTable::from_long(Vec::<(String, String, f64)>::new()).unwrap();
        assert!(run_bins(&empty, &empty, &ActivityConfig::bin()).is_err());
    }
}
