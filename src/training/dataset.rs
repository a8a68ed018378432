//! Labelled training data loaded from CSV.

use std::io::Read;
use std::path::Path;

use crate::error::{LifeboatError, Result};
use crate::payload::FeatureMatrix;

/// Features + 0/1 labels, one row per passenger.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: FeatureMatrix,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn from_path<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            LifeboatError::Dataset(format!("cannot open {}: {e}", path.display()))
        })?;
        Self::from_reader(std::io::BufReader::new(file), label_column)
    }

    /// Parse a CSV with a header row. Every non-label column is a feature,
    /// in file order. Empty cells are filled with the column mean.
    pub fn from_reader<R: Read>(reader: R, label_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| LifeboatError::Dataset(e.to_string()))?
            .clone();
        let label_idx = headers
            .iter()
            .position(|h| h == label_column)
            .ok_or_else(|| {
                LifeboatError::Dataset(format!("label column {label_column:?} not found"))
            })?;
        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_idx)
            .map(|(_, h)| h.to_string())
            .collect();
        if feature_names.is_empty() {
            return Err(LifeboatError::Dataset("no feature columns".to_string()));
        }

        let mut raw_rows: Vec<Vec<Option<f64>>> = Vec::new();
        let mut labels = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|e| LifeboatError::Dataset(e.to_string()))?;
            let mut row = Vec::with_capacity(feature_names.len());
            for (col, field) in record.iter().enumerate() {
                if col == label_idx {
                    labels.push(parse_label(field, line)?);
                } else if field.is_empty() {
                    row.push(None);
                } else {
                    let v = field
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| {
                            LifeboatError::Dataset(format!(
                                "non-numeric value {field:?} in column {:?} (data row {line})",
                                headers.get(col).unwrap_or_default()
                            ))
                        })?;
                    row.push(Some(v));
                }
            }
            raw_rows.push(row);
        }
        if raw_rows.is_empty() {
            return Err(LifeboatError::Dataset("no data rows".to_string()));
        }

        let rows = impute_column_means(raw_rows, &feature_names)?;
        let features = FeatureMatrix::from_rows(rows)
            .map_err(|e| LifeboatError::Dataset(e.to_string()))?;

        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.n_cols()
    }

    pub fn positive_rate(&self) -> f64 {
        let pos = self.labels.iter().filter(|l| **l == 1).count();
        pos as f64 / self.labels.len().max(1) as f64
    }
}

fn parse_label(field: &str, line: usize) -> Result<u8> {
    match field.parse::<f64>() {
        Ok(v) if v == 0.0 => Ok(0),
        Ok(v) if v == 1.0 => Ok(1),
        _ => Err(LifeboatError::Dataset(format!(
            "label must be 0 or 1, got {field:?} (data row {line})"
        ))),
    }
}

fn impute_column_means(rows: Vec<Vec<Option<f64>>>, names: &[String]) -> Result<Vec<Vec<f64>>> {
    let n_cols = names.len();
    let mut sums = vec![0.0; n_cols];
    let mut counts = vec![0usize; n_cols];
    for row in &rows {
        for (c, v) in row.iter().enumerate() {
            if let Some(v) = v {
                sums[c] += v;
                counts[c] += 1;
            }
        }
    }
    if let Some(c) = counts.iter().position(|n| *n == 0) {
        return Err(LifeboatError::Dataset(format!(
            "column {:?} has no values",
            names[c]
        )));
    }
    let means: Vec<f64> = sums.iter().zip(&counts).map(|(s, n)| s / *n as f64).collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(c, v)| v.unwrap_or(means[c]))
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Survived,Pclass,Sex,Age,Fare
0,3,0,22,7.25
1,1,1,38,71.28
1,3,1,,7.92
0,1,0,54,51.86
";

    #[test]
    fn splits_label_from_features() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes(), "Survived").unwrap();
        assert_eq!(ds.feature_names, vec!["Pclass", "Sex", "Age", "Fare"]);
        assert_eq!(ds.labels, vec![0, 1, 1, 0]);
        assert_eq!(ds.features.shape(), (4, 4));
        assert!((ds.positive_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn missing_cells_take_column_mean() {
        let ds = Dataset::from_reader(SAMPLE.as_bytes(), "Survived").unwrap();
        let expected = (22.0 + 38.0 + 54.0) / 3.0;
        assert!((ds.features.row(2)[2] - expected).abs() < 1e-12);
    }

    #[test]
    fn label_column_anywhere() {
        let csv = "a,label,b\n1,0,2\n3,1,4\n";
        let ds = Dataset::from_reader(csv.as_bytes(), "label").unwrap();
        assert_eq!(ds.features.row(1), &[3.0, 4.0]);
        assert_eq!(ds.labels, vec![0, 1]);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(Dataset::from_reader(SAMPLE.as_bytes(), "Target").is_err());
        assert!(Dataset::from_reader("y,x\n2,1\n".as_bytes(), "y").is_err());
        assert!(Dataset::from_reader("y,x\n1,male\n".as_bytes(), "y").is_err());
        assert!(Dataset::from_reader("y,x\n1,\n0,\n".as_bytes(), "y").is_err());
        assert!(Dataset::from_reader("y,x\n".as_bytes(), "y").is_err());
    }

    #[test]
    fn rejects_non_finite_features() {
        for bad in ["NaN", "inf", "-inf"] {
            let csv = format!("y,x\n0,1\n0,2\n0,3\n1,{bad}\n");
            let err = Dataset::from_reader(csv.as_bytes(), "y").unwrap_err();
            assert!(matches!(err, LifeboatError::Dataset(_)), "{bad}");
            assert!(err.to_string().contains(bad), "{bad}: {err}");
        }
    }
}
