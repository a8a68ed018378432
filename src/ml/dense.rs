//! Dense neural network inference (CPU-only).
//!
//! Small MLPs stored as JSON. For serving, the last layer must be a single
//! sigmoid unit so every row maps to a survival probability in [0, 1].
//!
//! Shapes are validated at load time; a bad artifact never reaches predict.

use serde::{Deserialize, Serialize};

use crate::error::{LifeboatError, Result};
use crate::ml::model::Classifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Bias shape: [out_dim]
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    pub(crate) fn in_dim(&self) -> usize {
        self.weights.first().map(|r| r.len()).unwrap_or(0)
    }

    pub(crate) fn out_dim(&self) -> usize {
        self.weights.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Expected input dimension (feature count at training time).
    pub input_dim: usize,

    /// Optional z-score normalization.
    #[serde(default)]
    pub input_mean: Option<Vec<f64>>,
    #[serde(default)]
    pub input_std: Option<Vec<f64>>,

    pub layers: Vec<DenseLayer>,

    /// Optional free-form metadata (training info, feature names, etc).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DenseNetwork {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be > 0".to_string());
        }
        if self.layers.is_empty() {
            return Err("layers must not be empty".to_string());
        }
        if let (Some(mean), Some(std)) = (&self.input_mean, &self.input_std) {
            if mean.len() != self.input_dim {
                return Err(format!(
                    "input_mean length {} != input_dim {}",
                    mean.len(),
                    self.input_dim
                ));
            }
            if std.len() != self.input_dim {
                return Err(format!(
                    "input_std length {} != input_dim {}",
                    std.len(),
                    self.input_dim
                ));
            }
            if mean.iter().any(|v| !v.is_finite()) {
                return Err("input_mean must be finite".to_string());
            }
            if std.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err("input_std must be finite and > 0".to_string());
            }
        } else if self.input_mean.is_some() || self.input_std.is_some() {
            return Err("input_mean and input_std must be provided together".to_string());
        }

        let mut expected_in = self.input_dim;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.out_dim() == 0 {
                return Err(format!("layer[{idx}] out_dim must be > 0"));
            }
            if layer.bias.len() != layer.out_dim() {
                return Err(format!(
                    "layer[{idx}] bias len {} != out_dim {}",
                    layer.bias.len(),
                    layer.out_dim()
                ));
            }
            for (r, row) in layer.weights.iter().enumerate() {
                if row.len() != expected_in {
                    return Err(format!(
                        "layer[{idx}] weights row {r} len {} != expected in_dim {expected_in}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(format!("layer[{idx}] weights contain non-finite values"));
                }
            }
            if layer.bias.iter().any(|v| !v.is_finite()) {
                return Err(format!("layer[{idx}] bias contain non-finite values"));
            }
            expected_in = layer.out_dim();
        }
        Ok(())
    }

    /// Structural checks plus the binary-classifier head: one sigmoid output.
    pub fn validate_classifier(&self) -> std::result::Result<(), String> {
        self.validate()?;
        if self.output_dim() != 1 {
            return Err(format!(
                "classifier output_dim must be 1, got {}",
                self.output_dim()
            ));
        }
        match self.layers.last().map(|l| l.activation) {
            Some(Activation::Sigmoid) => Ok(()),
            other => Err(format!(
                "classifier output activation must be sigmoid, got {other:?}"
            )),
        }
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim()).unwrap_or(0)
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_dim {
            return Err(LifeboatError::FeatureCountMismatch {
                expected: self.input_dim,
                got: input.len(),
            });
        }

        let mut x: Vec<f64> = input.to_vec();

        if let (Some(mean), Some(std)) = (&self.input_mean, &self.input_std) {
            for i in 0..x.len() {
                let denom = std[i].max(1e-12);
                x[i] = (x[i] - mean[i]) / denom;
            }
        }

        for layer in &self.layers {
            x = layer_forward(layer, &x);
        }

        Ok(x)
    }

    pub fn forward_scalar(&self, input: &[f64]) -> Result<f64> {
        let out = self.forward(input)?;
        if out.len() != 1 {
            return Err(LifeboatError::Validation(format!(
                "DenseNetwork forward_scalar expects output_dim=1, got {}",
                out.len()
            )));
        }
        Ok(out[0])
    }
}

impl Classifier for DenseNetwork {
    fn n_features(&self) -> usize {
        self.input_dim
    }

    fn score_row(&self, row: &[f64]) -> Result<f64> {
        self.forward_scalar(row)
    }
}

pub(crate) fn layer_forward(layer: &DenseLayer, x: &[f64]) -> Vec<f64> {
    layer
        .weights
        .iter()
        .zip(&layer.bias)
        .map(|(row, b)| {
            // weights[o] is the o-th row (len = in_dim)
            let sum = row.iter().zip(x).fold(*b, |acc, (w, v)| acc + w * v);
            apply_activation(sum, layer.activation)
        })
        .collect()
}

pub(crate) fn apply_activation(x: f64, act: Activation) -> f64 {
    match act {
        Activation::Linear => x,
        Activation::Relu => x.max(0.0),
        Activation::Tanh => x.tanh(),
        Activation::Sigmoid => sigmoid(x),
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    // Numerically-stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
