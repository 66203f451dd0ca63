//! Second-order regression trees used as boosting stages

use crate::models::FeatureVector;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum depth; a depth of 0 is a single leaf
    pub max_depth: usize,
    /// L2 penalty on leaf weights
    pub l2_regularization: f64,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    /// Minimum loss reduction required to split
    pub min_split_gain: f64,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A regression tree fitted to gradient statistics
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit a tree to the gradients and hessians of `rows`.
    ///
    /// Leaf weights are the Newton step `-G / (H + lambda)`; the caller applies
    /// the learning rate.
    pub fn fit(
        features: &[FeatureVector],
        gradients: &[f64],
        hessians: &[f64],
        rows: &[usize],
        params: &TreeParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(features, gradients, hessians, rows.to_vec(), 0, params);
        tree
    }

    /// Predict the leaf weight for one row
    pub fn predict(&self, x: &FeatureVector) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of leaves
    pub fn leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    fn grow(
        &mut self,
        features: &[FeatureVector],
        gradients: &[f64],
        hessians: &[f64],
        rows: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let idx = self.nodes.len();
        let g: f64 = rows.iter().map(|&r| gradients[r]).sum();
        let h: f64 = rows.iter().map(|&r| hessians[r]).sum();
        self.nodes.push(Node::Leaf {
            weight: -g / (h + params.l2_regularization),
        });

        if depth >= params.max_depth || rows.len() < 2 {
            return idx;
        }

        let Some(split) = best_split(features, gradients, hessians, &rows, g, h, params) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| features[r][split.feature] < split.threshold);

        let left = self.grow(features, gradients, hessians, left_rows, depth + 1, params);
        let right = self.grow(features, gradients, hessians, right_rows, depth + 1, params);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }
}

/// Exact greedy search over every feature and every boundary between distinct values.
///
/// Ties keep the first candidate found, scanning features in column order and
/// thresholds in ascending order.
fn best_split(
    features: &[FeatureVector],
    gradients: &[f64],
    hessians: &[f64],
    rows: &[usize],
    g_total: f64,
    h_total: f64,
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let lambda = params.l2_regularization;
    let parent_score = g_total * g_total / (h_total + lambda);
    let mut best: Option<SplitCandidate> = None;

    let mut sorted = rows.to_vec();
    for feature in 0..features.first().map_or(0, |f| f.len()) {
        sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        for pair in sorted.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            g_left += gradients[current];
            h_left += hessians[current];

            let (x_current, x_next) = (features[current][feature], features[next][feature]);
            if x_current == x_next {
                continue;
            }

            let g_right = g_total - g_left;
            let h_right = h_total - h_left;
            if h_left < params.min_child_weight || h_right < params.min_child_weight {
                continue;
            }

            let gain = g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                - parent_score;
            if gain <= params.min_split_gain {
                continue;
            }
            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (x_current + x_next) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
