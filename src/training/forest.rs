//! Random-forest fitting: bootstrap samples, Gini splits, sqrt(d) feature
//! subsampling per split.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{LifeboatError, Result};
use crate::ml::forest::{DecisionTree, RandomForest, TreeNode};
use crate::payload::FeatureMatrix;
use crate::training::dataset::Dataset;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Candidate features per split; `None` means sqrt(n_features).
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 10,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

pub fn fit_forest(ds: &Dataset, params: &ForestParams) -> Result<RandomForest> {
    if params.n_estimators == 0 {
        return Err(LifeboatError::Training("n_estimators must be > 0".to_string()));
    }
    let n_features = ds.n_features();
    let max_features = params
        .max_features
        .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
        .clamp(1, n_features);

    let mut rng = StdRng::seed_from_u64(params.seed);
    let n = ds.n_samples();
    let mut trees = Vec::with_capacity(params.n_estimators);
    for t in 0..params.n_estimators {
        let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let mut builder = TreeBuilder {
            x: &ds.features,
            y: &ds.labels,
            params,
            max_features,
            nodes: Vec::new(),
        };
        builder.grow(&mut sample, 0, &mut rng);
        let tree = DecisionTree::new(builder.nodes);
        debug!(tree = t, nodes = tree.nodes.len(), depth = tree.depth(), "grew tree");
        trees.push(tree);
    }

    Ok(RandomForest {
        n_features,
        trees,
        metadata: serde_json::Value::Null,
    })
}

struct TreeBuilder<'a> {
    x: &'a FeatureMatrix,
    y: &'a [u8],
    params: &'a ForestParams,
    max_features: usize,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `idx`, returning its node index. Children are
    /// always pushed after their parent.
    fn grow(&mut self, idx: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let node_id = self.nodes.len();
        let n = idx.len();
        let pos = idx.iter().filter(|&&i| self.y[i] == 1).count();
        self.nodes.push(TreeNode::leaf(pos as f64 / n as f64));

        let depth_left = self.params.max_depth.map_or(true, |d| depth < d);
        if !depth_left || n < self.params.min_samples_split || pos == 0 || pos == n {
            return node_id;
        }
        let Some((feature, threshold)) = self.best_split(idx, pos, rng) else {
            return node_id;
        };

        let mut mid = 0;
        for k in 0..n {
            if self.x.row(idx[k])[feature] <= threshold {
                idx.swap(mid, k);
                mid += 1;
            }
        }
        if mid == 0 || mid == n {
            return node_id;
        }
        let (left_idx, right_idx) = idx.split_at_mut(mid);
        let left = self.grow(left_idx, depth + 1, rng);
        let right = self.grow(right_idx, depth + 1, rng);
        self.nodes[node_id] = TreeNode::split(feature, threshold, left, right);
        node_id
    }

    fn best_split(&self, idx: &[usize], pos: usize, rng: &mut StdRng) -> Option<(usize, f64)> {
        let n = idx.len() as f64;
        let parent = gini(pos as f64, n);
        let features = rand::seq::index::sample(rng, self.x.n_cols(), self.max_features);

        // (feature, threshold, weighted child impurity)
        let mut best: Option<(usize, f64, f64)> = None;
        let mut order: Vec<(f64, u8)> = Vec::with_capacity(idx.len());
        for feature in features.iter() {
            order.clear();
            order.extend(idx.iter().map(|&i| (self.x.row(i)[feature], self.y[i])));
            order.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_pos = 0usize;
            for k in 0..order.len() - 1 {
                left_pos += usize::from(order[k].1);
                let (lo, hi) = (order[k].0, order[k + 1].0);
                if lo == hi || !lo.is_finite() || !hi.is_finite() {
                    continue;
                }
                let nl = (k + 1) as f64;
                let nr = n - nl;
                let impurity =
                    (nl * gini(left_pos as f64, nl) + nr * gini((pos - left_pos) as f64, nr)) / n;
                if best.map_or(true, |b| impurity < b.2) {
                    // Halves first: the midpoint of two large finite values stays finite.
                    let mut threshold = lo / 2.0 + hi / 2.0;
                    if !(lo..hi).contains(&threshold) {
                        threshold = lo;
                    }
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        best.filter(|b| b.2 < parent - 1e-12).map(|(f, t, _)| (f, t))
    }
}

/// Binary Gini impurity for `pos` positives out of `n`.
fn gini(pos: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let p = pos / n;
    2.0 * p * (1.0 - p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Classifier;

    fn sex_only(n: usize) -> Dataset {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![(i % 2) as f64]).collect();
        let labels = (0..n).map(|i| (i % 2) as u8).collect();
        Dataset {
            feature_names: vec!["Sex".to_string()],
            features: FeatureMatrix::from_rows(rows).unwrap(),
            labels,
        }
    }

    #[test]
    fn learns_a_perfect_split() {
        let ds = sex_only(20);
        let forest = fit_forest(&ds, &ForestParams::default()).unwrap();
        forest.validate().unwrap();
        assert_eq!(forest.num_trees(), 10);
        assert_eq!(forest.n_features, 1);
        assert_eq!(forest.predict_labels(&ds.features).unwrap(), ds.labels);
    }

    #[test]
    fn same_seed_same_forest() {
        let ds = Dataset::from_reader(
            "y,a,b\n0,1,5\n1,2,3\n1,3,1\n0,4,4\n1,5,2\n0,6,6\n".as_bytes(),
            "y",
        )
        .unwrap();
        let params = ForestParams {
            n_estimators: 4,
            ..ForestParams::default()
        };
        assert_eq!(fit_forest(&ds, &params).unwrap(), fit_forest(&ds, &params).unwrap());
    }

    #[test]
    fn max_depth_zero_gives_stumps_of_leaves() {
        let params = ForestParams {
            max_depth: Some(0),
            ..ForestParams::default()
        };
        let forest = fit_forest(&sex_only(10), &params).unwrap();
        assert!(forest.trees.iter().all(|t| t.nodes.len() == 1 && t.nodes[0].is_leaf()));
    }

    #[test]
    fn non_finite_feature_values_never_become_thresholds() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0], vec![f64::NAN], vec![f64::NEG_INFINITY]];
        let ds = Dataset {
            feature_names: vec!["Fare".to_string()],
            features: FeatureMatrix::from_rows(rows).unwrap(),
            labels: vec![0, 0, 0, 1, 1],
        };
        let forest = fit_forest(&ds, &ForestParams::default()).unwrap();
        forest.validate().unwrap();
        for tree in &forest.trees {
            for node in &tree.nodes {
                if let TreeNode::Split { threshold, .. } = node {
                    assert!(threshold.is_finite());
                }
            }
        }
    }

    #[test]
    fn gini_extremes() {
        assert_eq!(gini(0.0, 4.0), 0.0);
        assert_eq!(gini(4.0, 4.0), 0.0);
        assert!((gini(2.0, 4.0) - 0.5).abs() < 1e-12);
    }
}
