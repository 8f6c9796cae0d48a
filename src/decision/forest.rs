//! Bagging ensemble of [`DecisionTree`]s for one actuator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, N_FEATURES, Row, TreeParams};
use crate::config::EnsembleConfig;

/// Majority-vote result for one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub on: bool,
    /// Fraction of trees agreeing with `on`, in `[0.5, 1]`.
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    /// Normalised impurity importances, one row per tree
    tree_importances: Vec<[f32; N_FEATURES]>,
}

impl Forest {
    /// Fit `cfg.n_trees` trees, each on a bootstrap resample of `train_idx`.
    pub fn fit(
        rows: &[Row],
        labels: &[bool],
        train_idx: &[usize],
        cfg: &EnsembleConfig,
        rng: &mut impl Rng,
    ) -> Self {
        let params = TreeParams {
            max_depth: cfg.max_depth,
            min_samples_split: cfg.min_samples_split as usize,
            min_samples_leaf: cfg.min_samples_leaf as usize,
            max_features: (N_FEATURES as f32).sqrt().round() as usize,
        };
        let n = train_idx.len();
        let mut trees = Vec::with_capacity(cfg.n_trees as usize);
        let mut tree_importances = Vec::with_capacity(cfg.n_trees as usize);
        let mut bootstrap = vec![0usize; n];

        for _ in 0..cfg.n_trees {
            for slot in &mut bootstrap {
                *slot = train_idx[rng.gen_range(0..n)];
            }
            let (tree, raw) = DecisionTree::fit(rows, labels, &bootstrap, &params, rng);
            trees.push(tree);
            tree_importances.push(normalise(raw));
        }
        Self {
            trees,
            tree_importances,
        }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn predict(&self, x: &Row) -> Decision {
        let n = self.trees.len();
        if n == 0 {
            return Decision {
                on: false,
                confidence: 0.0,
            };
        }
        let yes = self.trees.iter().filter(|t| t.predict(x)).count();
        let on = yes * 2 > n;
        let agree = if on { yes } else { n - yes };
        Decision {
            on,
            confidence: agree as f32 / n as f32,
        }
    }

    pub fn tree_importances(&self) -> &[[f32; N_FEATURES]] {
        &self.tree_importances
    }

    /// Mean of the per-tree importances, renormalised to sum to 1.
    pub fn importances(&self) -> [f32; N_FEATURES] {
        let mut sum = [0.0f64; N_FEATURES];
        for row in &self.tree_importances {
            for (s, v) in sum.iter_mut().zip(row) {
                *s += f64::from(*v);
            }
        }
        normalise(sum)
    }
}

fn normalise(raw: [f64; N_FEATURES]) -> [f32; N_FEATURES] {
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return [0.0; N_FEATURES];
    }
    raw.map(|v| (v / total) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cfg(n_trees: u16) -> EnsembleConfig {
        EnsembleConfig {
            n_trees,
            ..EnsembleConfig::default()
        }
    }

    #[test]
    fn votes_and_confidence() {
        let rows: Vec<Row> = (0..200)
            .map(|i| [(i % 50) as f32, (i % 13) as f32, (i % 7) as f32, (i % 3) as f32])
            .collect();
        let labels: Vec<bool> = rows.iter().map(|r| r[0] > 25.0).collect();
        let idx: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let forest = Forest::fit(&rows, &labels, &idx, &cfg(25), &mut rng);

        assert_eq!(forest.len(), 25);
        let hot = forest.predict(&[45.0, 3.0, 3.0, 1.0]);
        assert!(hot.on);
        assert!((0.5..=1.0).contains(&hot.confidence));
        assert!(!forest.predict(&[2.0, 3.0, 3.0, 1.0]).on);

        let imp = forest.importances();
        assert!((imp.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!(imp[0] > imp[3]);
    }

    #[test]
    fn empty_forest_predicts_off() {
        let f = Forest {
            trees: Vec::new(),
            tree_importances: Vec::new(),
        };
        let d = f.predict(&[0.0; 4]);
        assert!(!d.on);
        assert!(d.confidence.abs() < f32::EPSILON);
    }
}
