//! Feature matrix and shape normalization.
//!
//! A payload with no row delimiter is always read as one sample with many
//! features (1 x N), never as N samples of one feature.

use crate::error::{LifeboatError, Result};

/// Rectangular, row-major matrix of features. One row per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_rows: usize,
    n_cols: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Build from rows. Rejects empty input and ragged rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.is_empty() || n_cols == 0 {
            return Err(LifeboatError::MalformedPayload(
                "feature matrix must have at least one row and one column".to_string(),
            ));
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(LifeboatError::MalformedPayload(format!(
                "row {idx} has {} columns, expected {n_cols}",
                row.len()
            )));
        }

        let n_rows = rows.len();
        let values = rows.into_iter().flatten().collect();
        Ok(Self {
            n_rows,
            n_cols,
            values,
        })
    }

    /// A single sample: 1 x `values.len()`.
    pub fn single_row(values: Vec<f64>) -> Result<Self> {
        Self::from_rows(vec![values])
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let start = idx * self.n_cols;
        &self.values[start..start + self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.n_cols)
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows().map(move |r| r[col])
    }
}

/// Decoder output before shape normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFeatures {
    /// One line, no row delimiter.
    Flat(Vec<f64>),
    /// One entry per delimited row.
    Rows(Vec<Vec<f64>>),
}

impl RawFeatures {
    pub fn ndim(&self) -> usize {
        match self {
            Self::Flat(_) => 1,
            Self::Rows(_) => 2,
        }
    }
}

/// Guarantee a 2-D matrix. Flat input becomes exactly one row; row input
/// passes through with column order untouched.
pub fn normalize(raw: RawFeatures) -> Result<FeatureMatrix> {
    match raw {
        RawFeatures::Flat(values) => FeatureMatrix::single_row(values),
        RawFeatures::Rows(rows) => FeatureMatrix::from_rows(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_becomes_one_row() {
        let m = normalize(RawFeatures::Flat(vec![3.0, 0.0, 22.0])).unwrap();
        assert_eq!(m.shape(), (1, 3));
        assert_eq!(m.row(0), &[3.0, 0.0, 22.0]);
    }

    #[test]
    fn rows_pass_through_in_order() {
        let m = normalize(RawFeatures::Rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]])).unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.rows().collect::<Vec<_>>(), vec![&[1.0, 2.0][..], &[3.0, 4.0][..]]);
        assert_eq!(m.column(1).collect::<Vec<_>>(), vec![2.0, 4.0]);
    }

    #[test]
    fn single_column_rows_stay_n_by_one() {
        let m = normalize(RawFeatures::Rows(vec![vec![1.0], vec![2.0]])).unwrap();
        assert_eq!(m.shape(), (2, 1));
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, LifeboatError::MalformedPayload(_)));
    }

    #[test]
    fn empty_rejected() {
        assert!(FeatureMatrix::from_rows(vec![]).is_err());
        assert!(normalize(RawFeatures::Flat(vec![])).is_err());
    }
}
