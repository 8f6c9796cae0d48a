//! CART binary classification tree over the four sensor features.
//!
//! Nodes live in a flat arena indexed by `u32`; the root is node 0.
//! Splits are chosen by Gini impurity decrease over a random subset of
//! features at every node, the bagging ensemble supplies the bootstrap.

use rand::Rng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// Number of input features (one per [`Metric`](crate::reading::Metric)).
pub const N_FEATURES: usize = 4;

pub type Row = [f32; N_FEATURES];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        vote: bool,
    },
    Split {
        feature: u8,
        threshold: f32,
        left: u32,
        right: u32,
    },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: u8,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Candidate split found while scanning one feature.
struct Candidate {
    feature: usize,
    threshold: f32,
    decrease: f64,
}

fn gini(pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = pos as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

impl DecisionTree {
    /// Grow a tree on `rows[i]` for every `i` in `sample_idx` (duplicates
    /// allowed).  Returns the tree and its unnormalised impurity importances.
    pub fn fit(
        rows: &[Row],
        labels: &[bool],
        sample_idx: &[usize],
        params: &TreeParams,
        rng: &mut impl Rng,
    ) -> (Self, [f64; N_FEATURES]) {
        let mut builder = Builder {
            rows,
            labels,
            params,
            nodes: Vec::new(),
            importances: [0.0; N_FEATURES],
        };
        let mut idx = sample_idx.to_vec();
        builder.grow(&mut idx, 0, rng);
        (Self { nodes: builder.nodes }, builder.importances)
    }

    pub fn predict(&self, x: &Row) -> bool {
        let mut at = 0usize;
        loop {
            match self.nodes.get(at) {
                Some(Node::Leaf { vote }) => return *vote,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    at = if x[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                None => return false,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match nodes.get(at) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Builder<'a> {
    rows: &'a [Row],
    labels: &'a [bool],
    params: &'a TreeParams,
    nodes: Vec<Node>,
    importances: [f64; N_FEATURES],
}

impl Builder<'_> {
    fn grow(&mut self, idx: &mut [usize], depth: u8, rng: &mut impl Rng) -> u32 {
        let id = self.nodes.len() as u32;
        let n = idx.len();
        let pos = idx.iter().filter(|&&i| self.labels[i]).count();
        // Ties go to OFF.
        let vote = pos * 2 > n;
        self.nodes.push(Node::Leaf { vote });

        let p = self.params;
        if depth >= p.max_depth
            || n < p.min_samples_split
            || n < 2 * p.min_samples_leaf
            || pos == 0
            || pos == n
        {
            return id;
        }

        let Some(best) = self.best_split(idx, pos, rng) else {
            return id;
        };
        self.importances[best.feature] += best.decrease;

        let mid = partition(idx, |i| self.rows[i][best.feature] <= best.threshold);
        let (l, r) = idx.split_at_mut(mid);
        let left = self.grow(l, depth + 1, rng);
        let right = self.grow(r, depth + 1, rng);
        self.nodes[id as usize] = Node::Split {
            feature: best.feature as u8,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, idx: &mut [usize], pos: usize, rng: &mut impl Rng) -> Option<Candidate> {
        let n = idx.len();
        let parent = n as f64 * gini(pos, n);
        let min_leaf = self.params.min_samples_leaf;
        let k = self.params.max_features.clamp(1, N_FEATURES);
        let mut best: Option<Candidate> = None;

        for feature in sample(rng, N_FEATURES, k) {
            idx.sort_unstable_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left_pos = 0usize;
            for split in 1..n {
                if self.labels[idx[split - 1]] {
                    left_pos += 1;
                }
                if split < min_leaf || n - split < min_leaf {
                    continue;
                }
                let lo = self.rows[idx[split - 1]][feature];
                let hi = self.rows[idx[split]][feature];
                if lo >= hi {
                    continue;
                }
                let right_pos = pos - left_pos;
                let child = split as f64 * gini(left_pos, split)
                    + (n - split) as f64 * gini(right_pos, n - split);
                let decrease = parent - child;
                if decrease > 1e-12 && best.as_ref().is_none_or(|b| decrease > b.decrease) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    // Midpoint can round up onto `hi` for adjacent floats.
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        decrease,
                    });
                }
            }
        }
        best
    }
}

/// Stable-enough in-place partition; returns the count satisfying `pred`.
fn partition(idx: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for j in 0..idx.len() {
        if pred(idx[j]) {
            idx.swap(mid, j);
            mid += 1;
        }
    }
    mid
}
