//! Single regression tree over gradient/hessian statistics

use crate::preprocess::Matrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Tree node; children are indices into the tree's node vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f32,
    },
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
}

impl Tree {
    /// Margin contribution for one feature row
    #[must_use]
    pub fn predict_row(&self, row: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Exact greedy tree construction with second-order split gain
pub(crate) struct TreeBuilder<'a> {
    pub x: &'a Matrix,
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    pub lambda: f64,
    pub min_child_weight: f64,
    pub learning_rate: f64,
    pub max_depth: usize,
}

struct Split {
    gain: f64,
    feature: usize,
    threshold: f32,
}

impl TreeBuilder<'_> {
    pub fn build(&self, rows: &[usize], features: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.grow(rows, features, 0, &mut nodes);
        Tree { nodes }
    }

    fn grow(
        &self,
        rows: &[usize],
        features: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
    ) -> usize {
        let total_g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let total_h: f64 = rows.iter().map(|&r| self.hess[r]).sum();

        if depth >= self.max_depth || rows.len() < 2 {
            return self.push_leaf(total_g, total_h, nodes);
        }

        let Some(split) = self.best_split(rows, features, total_g, total_h) else {
            return self.push_leaf(total_g, total_h, nodes);
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.x.row(r)[split.feature] < split.threshold);

        let node_idx = nodes.len();
        nodes.push(Node::Leaf { value: 0.0 }); // placeholder, patched below
        let left = self.grow(&left_rows, features, depth + 1, nodes);
        let right = self.grow(&right_rows, features, depth + 1, nodes);
        nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn push_leaf(&self, g: f64, h: f64, nodes: &mut Vec<Node>) -> usize {
        let value = (-g / (h + self.lambda) * self.learning_rate) as f32;
        nodes.push(Node::Leaf { value });
        nodes.len() - 1
    }

    fn best_split(
        &self,
        rows: &[usize],
        features: &[usize],
        total_g: f64,
        total_h: f64,
    ) -> Option<Split> {
        let parent_score = total_g * total_g / (total_h + self.lambda);
        let mut best: Option<Split> = None;

        for &feature in features {
            let mut order: Vec<(f32, usize)> = rows
                .iter()
                .map(|&r| (self.x.row(r)[feature], r))
                .collect();
            order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let mut left_g = 0.0;
            let mut left_h = 0.0;
            for i in 0..order.len() - 1 {
                let (value, row) = order[i];
                left_g += self.grad[row];
                left_h += self.hess[row];

                let next_value = order[i + 1].0;
                if next_value <= value {
                    continue; // cannot split between equal feature values
                }

                let right_g = total_g - left_g;
                let right_h = total_h - left_h;
                if left_h < self.min_child_weight || right_h < self.min_child_weight {
                    continue;
                }

                let gain = left_g * left_g / (left_h + self.lambda)
                    + right_g * right_g / (right_h + self.lambda)
                    - parent_score;
                if gain <= 1e-12 {
                    continue;
                }
                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split {
                        gain,
                        feature,
                        threshold: ((f64::from(value) + f64::from(next_value)) / 2.0) as f32,
                    });
                }
            }
        }

        best
    }
}
