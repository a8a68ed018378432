//! Dense network fitting: ReLU hidden layers, sigmoid output, binary
//! cross-entropy, full-batch Adam.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{LifeboatError, Result};
use crate::ml::dense::{layer_forward, Activation, DenseLayer, DenseNetwork};
use crate::payload::FeatureMatrix;
use crate::training::dataset::Dataset;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct NetworkParams {
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![16],
            epochs: 200,
            learning_rate: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkFit {
    pub network: DenseNetwork,
    /// Mean cross-entropy after the last epoch.
    pub final_loss: f64,
}

pub fn fit_network(ds: &Dataset, params: &NetworkParams) -> Result<NetworkFit> {
    if params.hidden_layers.iter().any(|w| *w == 0) {
        return Err(LifeboatError::Training(
            "hidden layer widths must be > 0".to_string(),
        ));
    }

    let (mean, std) = column_stats(&ds.features);
    let xs: Vec<Vec<f64>> = ds
        .features
        .rows()
        .map(|r| {
            r.iter()
                .zip(mean.iter().zip(&std))
                .map(|(v, (m, s))| (v - m) / s)
                .collect()
        })
        .collect();
    let ys: Vec<f64> = ds.labels.iter().map(|l| f64::from(*l)).collect();
    let n = xs.len() as f64;

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut dims = vec![ds.n_features()];
    dims.extend(&params.hidden_layers);
    dims.push(1);
    let last = dims.len() - 2;
    let mut layers: Vec<DenseLayer> = Vec::with_capacity(dims.len() - 1);
    for (l, w) in dims.windows(2).enumerate() {
        let activation = if l == last {
            Activation::Sigmoid
        } else {
            Activation::Relu
        };
        layers.push(init_layer(&mut rng, w[0], w[1], activation));
    }

    let mut adam = Adam::new(&layers);
    let mut loss = f64::NAN;
    for epoch in 0..params.epochs {
        let mut grads = zeros_like(&layers);
        let mut total = 0.0;

        for (x, y) in xs.iter().zip(&ys) {
            // acts[0] is the input, acts[l + 1] the output of layers[l].
            let mut acts: Vec<Vec<f64>> = Vec::with_capacity(layers.len() + 1);
            acts.push(x.clone());
            for layer in &layers {
                let out = layer_forward(layer, &acts[acts.len() - 1]);
                acts.push(out);
            }

            let p = acts[layers.len()][0];
            let pc = p.clamp(1e-12, 1.0 - 1e-12);
            total -= y * pc.ln() + (1.0 - y) * (1.0 - pc).ln();

            // d(BCE)/dz for a sigmoid output is p - y.
            let mut delta = vec![(p - y) / n];
            for l in (0..layers.len()).rev() {
                let a_prev = &acts[l];
                for (o, d) in delta.iter().enumerate() {
                    grads[l].bias[o] += d;
                    for (g, a) in grads[l].weights[o].iter_mut().zip(a_prev) {
                        *g += d * a;
                    }
                }
                if l == 0 {
                    break;
                }
                let mut prev = vec![0.0; a_prev.len()];
                for (row, d) in layers[l].weights.iter().zip(&delta) {
                    for (p, w) in prev.iter_mut().zip(row) {
                        *p += w * d;
                    }
                }
                // ReLU gate on the previous layer's output.
                for (p, a) in prev.iter_mut().zip(a_prev) {
                    if *a <= 0.0 {
                        *p = 0.0;
                    }
                }
                delta = prev;
            }
        }

        loss = total / n;
        if !loss.is_finite() {
            return Err(LifeboatError::Training(format!(
                "loss diverged at epoch {epoch}"
            )));
        }
        adam.step(&mut layers, &grads, params.learning_rate);
        if epoch % 50 == 0 {
            debug!(epoch, loss, "network epoch");
        }
    }

    let network = DenseNetwork {
        input_dim: ds.n_features(),
        input_mean: Some(mean),
        input_std: Some(std),
        layers,
        metadata: serde_json::Value::Null,
    };
    network
        .validate_classifier()
        .map_err(LifeboatError::Training)?;

    Ok(NetworkFit {
        network,
        final_loss: loss,
    })
}

/// Per-column mean and std; a zero or non-finite std becomes 1.
fn column_stats(x: &FeatureMatrix) -> (Vec<f64>, Vec<f64>) {
    let n = x.n_rows() as f64;
    let mut mean = Vec::with_capacity(x.n_cols());
    let mut std = Vec::with_capacity(x.n_cols());
    for c in 0..x.n_cols() {
        let m = x.column(c).sum::<f64>() / n;
        let var = x.column(c).map(|v| (v - m).powi(2)).sum::<f64>() / n;
        let s = var.sqrt();
        mean.push(m);
        std.push(if s.is_finite() && s > 1e-12 { s } else { 1.0 });
    }
    (mean, std)
}

fn init_layer(rng: &mut StdRng, fan_in: usize, fan_out: usize, activation: Activation) -> DenseLayer {
    // He-uniform for ReLU, Glorot-uniform for the sigmoid head.
    let limit = match activation {
        Activation::Relu => (6.0 / fan_in as f64).sqrt(),
        _ => (6.0 / (fan_in + fan_out) as f64).sqrt(),
    };
    let mut weights = Vec::with_capacity(fan_out);
    for _ in 0..fan_out {
        let mut row = Vec::with_capacity(fan_in);
        for _ in 0..fan_in {
            row.push(rng.gen_range(-limit..limit));
        }
        weights.push(row);
    }
    DenseLayer {
        weights,
        bias: vec![0.0; fan_out],
        activation,
    }
}

fn zeros_like(layers: &[DenseLayer]) -> Vec<DenseLayer> {
    layers
        .iter()
        .map(|l| DenseLayer {
            weights: vec![vec![0.0; l.in_dim()]; l.out_dim()],
            bias: vec![0.0; l.out_dim()],
            activation: l.activation,
        })
        .collect()
}

struct Adam {
    m: Vec<DenseLayer>,
    v: Vec<DenseLayer>,
    t: i32,
}

impl Adam {
    fn new(layers: &[DenseLayer]) -> Self {
        Self {
            m: zeros_like(layers),
            v: zeros_like(layers),
            t: 0,
        }
    }

    fn step(&mut self, layers: &mut [DenseLayer], grads: &[DenseLayer], lr: f64) {
        self.t += 1;
        let bc1 = 1.0 - BETA1.powi(self.t);
        let bc2 = 1.0 - BETA2.powi(self.t);
        let update = |p: &mut f64, g: f64, m: &mut f64, v: &mut f64| {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            let m_hat = *m / bc1;
            let v_hat = *v / bc2;
            *p -= lr * m_hat / (v_hat.sqrt() + ADAM_EPS);
        };

        for (l, layer) in layers.iter_mut().enumerate() {
            let (m, v, g) = (&mut self.m[l], &mut self.v[l], &grads[l]);
            for o in 0..layer.out_dim() {
                for i in 0..layer.weights[o].len() {
                    update(
                        &mut layer.weights[o][i],
                        g.weights[o][i],
                        &mut m.weights[o][i],
                        &mut v.weights[o][i],
                    );
                }
                update(&mut layer.bias[o], g.bias[o], &mut m.bias[o], &mut v.bias[o]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Classifier;

    /// Survived iff fare (column 1) is high; column 0 is noise-free filler.
    fn separable() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let high = i % 2 == 1;
            let fare = if high { 60.0 + i as f64 } else { 5.0 + (i % 7) as f64 };
            rows.push(vec![3.0, fare]);
            labels.push(u8::from(high));
        }
        Dataset {
            feature_names: vec!["Pclass".to_string(), "Fare".to_string()],
            features: FeatureMatrix::from_rows(rows).unwrap(),
            labels,
        }
    }

    #[test]
    fn fits_separable_data() {
        let ds = separable();
        let params = NetworkParams {
            hidden_layers: vec![8],
            epochs: 300,
            learning_rate: 0.05,
            seed: 7,
        };
        let fit = fit_network(&ds, &params).unwrap();
        assert!(fit.final_loss < 0.2, "loss {}", fit.final_loss);

        let labels = fit.network.predict_labels(&ds.features).unwrap();
        let correct = labels.iter().zip(&ds.labels).filter(|(a, b)| a == b).count();
        assert!(correct >= 38, "{correct}/40 correct");
    }

    #[test]
    fn constant_column_gets_unit_std() {
        let fit = fit_network(
            &separable(),
            &NetworkParams {
                epochs: 1,
                ..NetworkParams::default()
            },
        )
        .unwrap();
        let std = fit.network.input_std.unwrap();
        assert_eq!(std[0], 1.0);
        assert_eq!(fit.network.layers.len(), 2);
        assert_eq!(fit.network.layers[1].activation, Activation::Sigmoid);
    }

    #[test]
    fn deterministic_for_a_seed() {
        let params = NetworkParams {
            epochs: 20,
            ..NetworkParams::default()
        };
        let a = fit_network(&separable(), &params).unwrap();
        let b = fit_network(&separable(), &params).unwrap();
        assert_eq!(a.network, b.network);
    }

    #[test]
    fn zero_width_rejected() {
        let params = NetworkParams {
            hidden_layers: vec![4, 0],
            ..NetworkParams::default()
        };
        assert!(matches!(
            fit_network(&separable(), &params).unwrap_err(),
            LifeboatError::Training(_)
        ));
    }
}
