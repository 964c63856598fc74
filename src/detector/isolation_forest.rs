//! Isolation Forest over document feature rows
//!
//! Anomalies are easier to isolate by random axis-aligned splits, so they end
//! up on shorter paths. Scores are normalized to `[0, 1]`, higher meaning more
//! anomalous.
//!
//! # References
//!
//! Liu, F. T., Ting, K. M., & Zhou, Z. H. (2008). Isolation forest.
//! In 2008 Eighth IEEE International Conference on Data Mining (pp. 413-422).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Default sub-sampling size (following original paper)
const DEFAULT_SUBSAMPLE_SIZE: usize = 256;

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature_idx: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Unresolved samples, accounted for by the expected BST path length
    Leaf { size: usize },
}

impl IsolationNode {
    fn path_length(&self, sample: &[f64], current_depth: usize) -> f64 {
        match self {
            IsolationNode::Internal {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                let value = sample.get(*feature_idx).copied().unwrap_or(0.0);
                if value < *threshold {
                    left.path_length(sample, current_depth + 1)
                } else {
                    right.path_length(sample, current_depth + 1)
                }
            }
            IsolationNode::Leaf { size } => current_depth as f64 + average_path_length(*size),
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` samples
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    // H(n-1) ≈ ln(n-1) + γ
    const EULER_GAMMA: f64 = 0.5772156649;
    2.0 * (((n - 1) as f64).ln() + EULER_GAMMA) - 2.0 * (n - 1) as f64 / n as f64
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(samples: &[&[f64]], max_depth: usize, rng: &mut StdRng) -> Self {
        IsolationTree {
            root: Self::build_node(samples, 0, max_depth, rng),
        }
    }

    fn build_node(
        samples: &[&[f64]],
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> IsolationNode {
        let leaf = IsolationNode::Leaf {
            size: samples.len(),
        };
        if depth >= max_depth || samples.len() <= 1 {
            return leaf;
        }
        if samples.windows(2).all(|w| w[0] == w[1]) {
            return leaf;
        }

        // Only features that vary can split
        let num_features = samples[0].len();
        let varying: Vec<(usize, f64, f64)> = (0..num_features)
            .filter_map(|f| {
                let (min, max) = samples.iter().fold((f64::MAX, f64::MIN), |(lo, hi), s| {
                    (lo.min(s[f]), hi.max(s[f]))
                });
                (max - min > f64::EPSILON).then_some((f, min, max))
            })
            .collect();
        let Some(&(feature_idx, min_val, max_val)) = varying.choose(rng) else {
            return leaf;
        };

        let threshold = rng.gen_range(min_val..max_val);
        let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
            samples.iter().copied().partition(|s| s[feature_idx] < threshold);
        if left.is_empty() || right.is_empty() {
            return leaf;
        }

        IsolationNode::Internal {
            feature_idx,
            threshold,
            left: Box::new(Self::build_node(&left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(&right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, sample: &[f64]) -> f64 {
        self.root.path_length(sample, 0)
    }
}

/// Ensemble of isolation trees with a fixed seed
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    num_trees: usize,
    subsample_size: usize,
    /// Sub-sample size actually used by the last `fit`
    fitted_size: usize,
    rng: StdRng,
}

impl IsolationForest {
    pub fn new(num_trees: usize, subsample_size: Option<usize>, seed: u64) -> Self {
        IsolationForest {
            trees: Vec::new(),
            num_trees,
            subsample_size: subsample_size.unwrap_or(DEFAULT_SUBSAMPLE_SIZE),
            fitted_size: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn fit(&mut self, samples: &[Vec<f64>]) {
        self.trees.clear();
        self.fitted_size = self.subsample_size.min(samples.len());
        if self.fitted_size == 0 {
            return;
        }
        let max_depth = (self.fitted_size as f64).log2().ceil().max(1.0) as usize;

        let mut indices: Vec<usize> = (0..samples.len()).collect();
        for _ in 0..self.num_trees {
            indices.shuffle(&mut self.rng);
            let subsample: Vec<&[f64]> = indices[..self.fitted_size]
                .iter()
                .map(|&i| samples[i].as_slice())
                .collect();
            let tree = IsolationTree::build(&subsample, max_depth, &mut self.rng);
            self.trees.push(tree);
        }
    }

    /// Anomaly score in `[0, 1]`; around 0.5 or below is normal
    pub fn anomaly_score(&self, sample: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let avg_path_length: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample))
            .sum::<f64>()
            / self.trees.len() as f64;

        let c = average_path_length(self.fitted_size);
        if c <= 0.0 {
            return 0.5;
        }
        2_f64.powf(-avg_path_length / c)
    }
}
