//! Random forest of CART trees (Gini impurity, bootstrap rows, random
//! feature subsets per split).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::common::error::{RiskError, RiskResult};

use super::domain::Classifier;

/// Hyper-parameters for [`RandomForest::fit`].
#[derive(Copy, Clone, Debug)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Candidate features per split; `None` means `sqrt(width)`.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        /// Positive fraction of the (bootstrap) samples reaching the leaf.
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flat tree; node 0 is the root. `x[feature] <= threshold` goes left.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[*feature] <= *threshold { *left } else { *right },
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
    /// Mean decrease in impurity, normalised to sum to 1.
    pub importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[u8], params: &ForestParams) -> RiskResult<Self> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(RiskError::Training {
                details: format!("random forest needs matching rows and labels, got {} and {}", n, y.len()),
            });
        }
        if params.n_estimators == 0 {
            return Err(RiskError::Training {
                details: "random forest needs at least one tree".to_string(),
            });
        }
        let width = x[0].len();
        if width == 0 || x.iter().any(|row| row.len() != width) {
            return Err(RiskError::Training {
                details: "random forest rows are empty or have uneven widths".to_string(),
            });
        }

        let max_features = params
            .max_features
            .unwrap_or_else(|| ((width as f64).sqrt() as usize).max(1))
            .clamp(1, width);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importances = vec![0.0; width];

        for _ in 0..params.n_estimators {
            let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            let mut builder = TreeBuilder {
                x,
                y,
                params,
                max_features,
                nodes: Vec::new(),
                importances: vec![0.0; width],
            };
            builder.grow(sample, 0, &mut rng);

            let total: f64 = builder.importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&builder.importances) {
                    *acc += v / total;
                }
            }
            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Self {
            n_features: width,
            trees,
            importances,
        })
    }
}

impl DecisionTree {
    /// Children must point strictly forward, which rules out cycles.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { proba } => {
                    if !(0.0..=1.0).contains(&proba) {
                        return Err(format!("leaf {idx} has probability {proba} outside [0, 1]"));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(format!("node {idx} splits on feature {feature} of {n_features}"));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!(
                                "node {idx} points to child {child} of {}",
                                self.nodes.len()
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl RandomForest {
    /// Structural check for a deserialised forest.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("random forest has no trees".to_string());
        }
        if self.importances.len() != self.n_features {
            return Err(format!(
                "random forest has {} importances for {} features",
                self.importances.len(),
                self.n_features
            ));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features).map_err(|err| format!("tree {t}: {err}"))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba_unchecked(&self, x: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(x)).sum();
        sum / self.trees.len() as f64
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    params: &'a ForestParams,
    max_features: usize,
    nodes: Vec<Node>,
    /// Weighted impurity decrease per feature for this tree.
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

fn gini(pos: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    let p = pos / total;
    2.0 * p * (1.0 - p)
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `sample` and return its node index.
    fn grow(&mut self, sample: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let total = sample.len() as f64;
        let pos = sample.iter().filter(|&&i| self.y[i] == 1).count() as f64;
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: pos / total });

        let pure = pos == 0.0 || pos == total;
        let too_deep = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || too_deep || sample.len() < self.params.min_samples_split {
            return idx;
        }

        let Some(best) = self.best_split(&sample, pos, rng) else {
            return idx;
        };
        self.importances[best.feature] += best.decrease;

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.x[i][best.feature] <= best.threshold);
        let left = self.grow(left, depth + 1, rng);
        let right = self.grow(right, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, sample: &[usize], pos: f64, rng: &mut StdRng) -> Option<BestSplit> {
        let width = self.x[0].len();
        let mut features: Vec<usize> = (0..width).collect();
        features.shuffle(rng);

        let total = sample.len() as f64;
        let parent = total * gini(pos, total);
        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = sample.to_vec();

        for &feature in features.iter().take(self.max_features) {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_n = 0.0;
            let mut left_pos = 0.0;
            for k in 0..order.len() - 1 {
                let i = order[k];
                left_n += 1.0;
                left_pos += f64::from(self.y[i]);
                let here = self.x[i][feature];
                let next = self.x[order[k + 1]][feature];
                if here == next {
                    continue;
                }
                let right_n = total - left_n;
                let right_pos = pos - left_pos;
                let child = left_n * gini(left_pos, left_n) + right_n * gini(right_pos, right_n);
                let decrease = parent - child;
                if best.as_ref().map_or(true, |b| decrease > b.decrease) {
                    best = Some(BestSplit {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        decrease,
                    });
                }
            }
        }

        // Normalise to a fraction of the root sample size, as sklearn does.
        best.filter(|b| b.decrease > 0.0).map(|b| BestSplit {
            decrease: b.decrease / self.x.len() as f64,
            ..b
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let signal = (i % 10) as f64;
            let noise = ((i * 7) % 5) as f64;
            x.push(vec![signal, noise]);
            y.push(u8::from(signal >= 5.0));
        }
        (x, y)
    }

    fn small() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            max_features: Some(2),
            ..ForestParams::default()
        }
    }

    #[test]
    fn separates_and_ranks_the_signal_feature() {
        let (x, y) = dataset();
        let forest = RandomForest::fit(&x, &y, &small()).unwrap();
        assert!(forest.predict_proba(&[9.0, 1.0]).unwrap() > 0.8);
        assert!(forest.predict_proba(&[0.0, 1.0]).unwrap() < 0.2);

        let imp = forest.feature_importances();
        assert_eq!(imp.len(), 2);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = dataset();
        let a = RandomForest::fit(&x, &y, &small()).unwrap();
        let b = RandomForest::fit(&x, &y, &small()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn depth_limit_is_respected() {
        let (x, y) = dataset();
        let params = ForestParams {
            max_depth: Some(0),
            ..small()
        };
        let forest = RandomForest::fit(&x, &y, &params).unwrap();
        assert!(forest.trees.iter().all(|t| t.nodes.len() == 1));
    }

    fn stump() -> RandomForest {
        RandomForest {
            n_features: 2,
            trees: vec![DecisionTree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.5,
                        left: 1,
                        right: 2,
                    },
                    Node::Leaf { proba: 0.1 },
                    Node::Leaf { proba: 0.9 },
                ],
            }],
            importances: vec![1.0, 0.0],
        }
    }

    fn root_mut(forest: &mut RandomForest) -> &mut Node {
        &mut forest.trees[0].nodes[0]
    }

    #[test]
    fn fitted_forest_passes_validation() {
        let (x, y) = dataset();
        RandomForest::fit(&x, &y, &small()).unwrap().validate().unwrap();
        stump().validate().unwrap();
    }

    #[test]
    fn validate_rejects_empty_forest() {
        let forest = RandomForest {
            trees: vec![],
            ..stump()
        };
        assert!(forest.validate().unwrap_err().contains("no trees"));
    }

    #[test]
    fn validate_rejects_out_of_range_feature() {
        let mut forest = stump();
        if let Node::Split { feature, .. } = root_mut(&mut forest) {
            *feature = 9999;
        }
        assert!(forest.validate().unwrap_err().contains("feature 9999"));
    }

    #[test]
    fn validate_rejects_backward_and_dangling_children() {
        let mut cyclic = stump();
        if let Node::Split { left, .. } = root_mut(&mut cyclic) {
            *left = 0;
        }
        assert!(cyclic.validate().is_err());

        let mut dangling = stump();
        if let Node::Split { right, .. } = root_mut(&mut dangling) {
            *right = 7;
        }
        assert!(dangling.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_leaf_probability() {
        let mut forest = stump();
        forest.trees[0].nodes[2] = Node::Leaf { proba: 1.5 };
        assert!(forest.validate().is_err());
        forest.trees[0].nodes[2] = Node::Leaf { proba: f64::NAN };
        assert!(forest.validate().is_err());
    }

    #[test]
    fn validate_rejects_importance_width_drift() {
        let forest = RandomForest {
            importances: vec![1.0],
            ..stump()
        };
        assert!(forest.validate().unwrap_err().contains("importances"));
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let (x, y) = dataset();
        let forest = RandomForest::fit(&x, &y, &small()).unwrap();
        for row in &x {
            let p = forest.predict_proba(row).unwrap();
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
