//! Request payload handling: body -> rectangular feature matrix.

pub mod decoder;
pub mod matrix;

pub use decoder::{decode, ensure_supported, CSV_CONTENT_TYPE};
pub use matrix::{normalize, FeatureMatrix, RawFeatures};
