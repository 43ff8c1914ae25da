//! Count matrix with sparse storage for paired abundance data.

use crate::error::{ActivityError, Result};
use sprs::{CsMat, TriMat};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A sparse matrix of non-negative abundances across samples.
///
/// Rows represent features (genes, pathways, taxa or bins), columns represent
/// samples. Values are real and non-negative; zero is a real observation
/// (dropout or true absence), never a missing-value marker. Uses CSR storage
/// because most feature tables are dominated by zeros.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<f64>,
    /// Feature identifiers (row names), unique within the matrix
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix from a sparse matrix and identifiers.
    ///
    /// Fails when the identifier lists do not match the matrix shape, when a
    /// feature or sample identifier repeats, or when a stored value is negative or not
    /// finite.
    pub fn new(data: CsMat<f64>, feature_ids: Vec<String>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(ActivityError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(ActivityError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }

        let mut seen = HashSet::with_capacity(feature_ids.len());
        for id in &feature_ids {
            if !seen.insert(id.as_str()) {
                return Err(ActivityError::DuplicateFeature(id.clone()));
            }
        }

        let mut seen = HashSet::with_capacity(sample_ids.len());
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(ActivityError::DuplicateSample(id.clone()));
            }
        }

        for (row, row_vec) in data.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                if !val.is_finite() || val < 0.0 {
                    return Err(ActivityError::InvalidValue {
                        value: val.to_string(),
                        row,
                        col,
                    });
                }
            }
        }

        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Build a matrix from dense rows (one `Vec` per feature).
    pub fn from_rows(
        rows: &[Vec<f64>],
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let n_samples = sample_ids.len();
        let mut tri_mat = TriMat::new((rows.len(), n_samples));
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_samples {
                return Err(ActivityError::DimensionMismatch {
                    expected: n_samples,
                    actual: values.len(),
                });
            }
            for (col, &val) in values.iter().enumerate() {
                if !val.is_finite() || val < 0.0 {
                    return Err(ActivityError::InvalidValue {
                        value: val.to_string(),
                        row,
                        col,
                    });
                }
                if val > 0.0 {
                    tri_mat.add_triplet(row, col, val);
                }
            }
        }
        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Load a matrix from a delimiter-separated file.
    ///
    /// Files ending in `.csv` are read comma-separated, everything else
    /// tab-separated. The first header field names the feature-id column and
    /// the remaining fields are sample identifiers.
    pub fn from_delimited<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
            _ => b'\t',
        };
        Self::from_reader(File::open(path)?, delimiter)
    }

    /// Parse a matrix from any reader using the given delimiter.
    pub fn from_reader<R: std::io::Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let header = rdr.headers()?.clone();
        if header.len() < 2 {
            return Err(ActivityError::EmptyData(
                "Table must have at least one sample column".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();

        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();

        for (row_idx, record) in rdr.records().enumerate() {
            let record = record?;
            let Some(feature_id) = record.get(0) else {
                continue;
            };
            feature_ids.push(feature_id.trim().to_string());

            for (col_idx, value_str) in record.iter().skip(1).enumerate().take(n_samples) {
                let value: f64 = value_str.trim().parse().map_err(|_| ActivityError::InvalidValue {
                    value: value_str.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                if !value.is_finite() || value < 0.0 {
                    return Err(ActivityError::InvalidValue {
                        value: value_str.to_string(),
                        row: row_idx,
                        col: col_idx,
                    });
                }
                if value > 0.0 {
                    triplets.push((row_idx, col_idx, value));
                }
            }
        }

        let n_features = feature_ids.len();
        if n_features == 0 {
            return Err(ActivityError::EmptyData("No features in table".to_string()));
        }

        let mut tri_mat = TriMat::new((n_features, n_samples));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Write the matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "feature_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row_idx, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for col_idx in 0..self.n_samples() {
                write!(writer, "\t{}", self.get(row_idx, col_idx))?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Get the value at (row, col), returning 0 for unstored entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col).copied().unwrap_or(0.0)
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column index of a sample, if present.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Map from feature identifier to row index.
    pub fn feature_index(&self) -> HashMap<&str, usize> {
        self.feature_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect()
    }

    /// Get a dense vector for a specific row (feature).
    pub fn row_dense(&self, row: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_samples()];
        if let Some(row_vec) = self.data.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Compute column sums (sequencing depth per sample).
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Subset the matrix to the given features (by index), in the given order.
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        let n_features = indices.len();
        let mut tri_mat = TriMat::new((n_features, self.n_samples()));
        let mut new_feature_ids = Vec::with_capacity(n_features);

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_features() {
                return Err(ActivityError::InvalidParameter(format!(
                    "Feature index {} out of bounds",
                    old_row
                )));
            }
            new_feature_ids.push(self.feature_ids[old_row].clone());

            if let Some(row_vec) = self.data.outer_view(old_row) {
                for (col, &val) in row_vec.iter() {
                    tri_mat.add_triplet(new_row, col, val);
                }
            }
        }

        Self::new(tri_mat.to_csr(), new_feature_ids, self.sample_ids.clone())
    }
}
