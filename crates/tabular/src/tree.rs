//! CART regression trees and a bagged forest of them.
//!
//! Splits minimise the summed squared error of the two children. Inputs
//! are column-major like the rest of the crate.

use crate::{Result, TabularError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const FOREST_TREES: usize = 100;
pub const FOREST_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: &[Vec<f64>], row: usize) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature][row] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub n_features: usize,
    pub root: Node,
}

impl RegressionTree {
    pub fn fit(params: TreeParams, x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        check_shape(x, y)?;
        let rows: Vec<usize> = (0..y.len()).collect();
        Ok(Self {
            n_features: x.len(),
            root: grow(&params, x, y, rows, 0),
        })
    }

    fn fit_rows(params: &TreeParams, x: &[Vec<f64>], y: &[f64], rows: Vec<usize>) -> Self {
        Self {
            n_features: x.len(),
            root: grow(params, x, y, rows, 0),
        }
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let n = check_width(self.n_features, x)?;
        Ok((0..n).map(|r| self.root.predict(x, r)).collect())
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

/// Bootstrap-aggregated trees; the prediction is the mean over trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(
        params: TreeParams,
        n_trees: usize,
        seed: u64,
        x: &[Vec<f64>],
        y: &[f64],
    ) -> Result<Self> {
        check_shape(x, y)?;
        if n_trees == 0 {
            return Err(TabularError::invalid("n_trees", "must be at least 1"));
        }
        let n = y.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let trees = (0..n_trees)
            .map(|_| {
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit_rows(&params, x, y, rows)
            })
            .collect();
        Ok(Self {
            n_features: x.len(),
            trees,
        })
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let n = check_width(self.n_features, x)?;
        let mut sum = vec![0.0; n];
        for tree in &self.trees {
            for (r, s) in sum.iter_mut().enumerate() {
                *s += tree.root.predict(x, r);
            }
        }
        let count = self.trees.len().max(1) as f64;
        Ok(sum.into_iter().map(|s| s / count).collect())
    }
}

pub(crate) fn check_shape(x: &[Vec<f64>], y: &[f64]) -> Result<()> {
    if x.is_empty() {
        return Err(TabularError::invalid("X", "no predictor columns"));
    }
    if y.is_empty() || x.iter().any(|c| c.len() != y.len()) {
        return Err(TabularError::InsufficientRows {
            needed: 1,
            found: y.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_width(expected: usize, x: &[Vec<f64>]) -> Result<usize> {
    if x.len() != expected {
        return Err(TabularError::invalid(
            "X",
            format!("model expects {expected} features, got {}", x.len()),
        ));
    }
    Ok(x.first().map(|c| c.len()).unwrap_or(0))
}

fn mean_of(y: &[f64], rows: &[usize]) -> f64 {
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len().max(1) as f64
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

fn grow(params: &TreeParams, x: &[Vec<f64>], y: &[f64], rows: Vec<usize>, depth: usize) -> Node {
    let leaf = Node::Leaf {
        value: mean_of(y, &rows),
    };
    if rows.len() < params.min_samples_split.max(2) || params.max_depth.is_some_and(|d| depth >= d)
    {
        return leaf;
    }
    let Some(best) = best_split(x, y, &rows) else {
        return leaf;
    };
    let (left, right): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&r| x[best.feature][r] <= best.threshold);
    Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(grow(params, x, y, left, depth + 1)),
        right: Box::new(grow(params, x, y, right, depth + 1)),
    }
}

/// Lowest-error split over every feature, or `None` when no split lowers
/// the parent's error.
fn best_split(x: &[Vec<f64>], y: &[f64], rows: &[usize]) -> Option<BestSplit> {
    let n = rows.len() as f64;
    let total: f64 = rows.iter().map(|&r| y[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
    let parent_sse = total_sq - total * total / n;
    let mut best: Option<BestSplit> = None;

    for (feature, column) in x.iter().enumerate() {
        let mut order = rows.to_vec();
        order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
        let (mut sum_l, mut sq_l) = (0.0, 0.0);
        for i in 0..order.len() - 1 {
            let yi = y[order[i]];
            sum_l += yi;
            sq_l += yi * yi;
            let (here, next) = (column[order[i]], column[order[i + 1]]);
            if here == next {
                continue;
            }
            let n_l = (i + 1) as f64;
            let n_r = n - n_l;
            let (sum_r, sq_r) = (total - sum_l, total_sq - sq_l);
            let sse = (sq_l - sum_l * sum_l / n_l) + (sq_r - sum_r * sum_r / n_r);
            if best.as_ref().map_or(true, |b| sse < b.sse) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    sse,
                });
            }
        }
    }
    best.filter(|b| b.sse < parent_sse - 1e-12 * parent_sse.abs().max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| if *v < 10.0 { 1.0 } else { 5.0 }).collect();
        (vec![x], y)
    }

    #[test]
    fn test_tree_finds_step() {
        let (x, y) = step();
        let tree = RegressionTree::fit(TreeParams::default(), &x, &y).unwrap();
        assert_eq!(tree.depth(), 1);
        match &tree.root {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 9.5),
            other => panic!("expected a split, got {other:?}"),
        }
        assert_eq!(tree.predict(&[vec![3.0, 15.0]]).unwrap(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_max_depth_zero_is_mean() {
        let (x, y) = step();
        let params = TreeParams {
            max_depth: Some(0),
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(params, &x, &y).unwrap();
        assert_eq!(tree.predict(&[vec![0.0]]).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_forest_is_seeded() {
        let (x, y) = step();
        let a = RandomForest::fit(TreeParams::default(), 10, 7, &x, &y).unwrap();
        let b = RandomForest::fit(TreeParams::default(), 10, 7, &x, &y).unwrap();
        assert_eq!(a, b);
        let pred = a.predict(&[vec![0.0, 19.0]]).unwrap();
        assert!(pred[0] < 3.0 && pred[1] > 3.0);
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = step();
        let tree = RegressionTree::fit(TreeParams::default(), &x, &y).unwrap();
        assert!(tree.predict(&[vec![1.0], vec![2.0]]).is_err());
    }
}
