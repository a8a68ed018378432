//! Request body decoding (`text/csv` only).

use crate::error::{LifeboatError, Result};
use crate::payload::matrix::RawFeatures;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Reject anything but `text/csv`. Media-type parameters such as
/// `charset` are ignored; the comparison is case-insensitive.
pub fn ensure_supported(content_type: &str) -> Result<()> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    if essence.eq_ignore_ascii_case(CSV_CONTENT_TYPE) {
        Ok(())
    } else {
        Err(LifeboatError::UnsupportedContentType(content_type.to_string()))
    }
}

/// Decode a request body. No header row is assumed and every field must
/// parse as `f64`.
///
/// A body without any line terminator comes back as [`RawFeatures::Flat`];
/// everything else as [`RawFeatures::Rows`].
pub fn decode(body: &[u8], content_type: &str) -> Result<RawFeatures> {
    ensure_supported(content_type)?;
    parse_csv(body)
}

fn parse_csv(body: &[u8]) -> Result<RawFeatures> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(body);

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LifeboatError::MalformedPayload(e.to_string()))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, field)| parse_field(field, idx, col))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(LifeboatError::MalformedPayload("empty body".to_string()));
    }

    let has_row_delimiter = body.iter().any(|b| *b == b'\n' || *b == b'\r');
    if rows.len() == 1 && !has_row_delimiter {
        Ok(RawFeatures::Flat(rows.remove(0)))
    } else {
        Ok(RawFeatures::Rows(rows))
    }
}

fn parse_field(field: &str, row: usize, col: usize) -> Result<f64> {
    field.parse::<f64>().map_err(|_| {
        LifeboatError::MalformedPayload(format!(
            "non-numeric field {field:?} at row {row}, column {col}"
        ))
    })
}
