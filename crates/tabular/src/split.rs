use crate::{Result, TabularError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Fewer rows than this cannot give a meaningful train/test split.
pub const MIN_SPLIT_ROWS: usize = 10;

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SplitMethod {
    Random {
        test_size: f64,
        #[serde(default = "default_seed")]
        seed: u64,
    },
    Sequential {
        test_size: f64,
    },
}

impl SplitMethod {
    pub fn test_size(&self) -> f64 {
        match self {
            SplitMethod::Random { test_size, .. } | SplitMethod::Sequential { test_size } => {
                *test_size
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `0..n` into train and test rows. The test side gets
/// `ceil(n * test_size)` rows; both sides are always non-empty.
pub fn split_indices(n: usize, method: &SplitMethod) -> Result<SplitIndices> {
    let test_size = method.test_size();
    if !test_size.is_finite() || test_size <= 0.0 || test_size >= 1.0 {
        return Err(TabularError::invalid(
            "test_size",
            format!("{test_size} must lie strictly between 0 and 1"),
        ));
    }
    if n < MIN_SPLIT_ROWS {
        return Err(TabularError::InsufficientRows {
            needed: MIN_SPLIT_ROWS,
            found: n,
        });
    }
    let n_test = ((n as f64 * test_size) - 1e-9).ceil().max(1.0) as usize;
    let n_test = n_test.min(n - 1);

    match method {
        SplitMethod::Random { seed, .. } => {
            let mut idx: Vec<usize> = (0..n).collect();
            let mut rng = StdRng::seed_from_u64(*seed);
            idx.shuffle(&mut rng);
            let mut test = idx[..n_test].to_vec();
            let mut train = idx[n_test..].to_vec();
            // keep source row order within each side
            test.sort_unstable();
            train.sort_unstable();
            Ok(SplitIndices { train, test })
        }
        SplitMethod::Sequential { .. } => Ok(SplitIndices {
            train: (0..n - n_test).collect(),
            test: (n - n_test..n).collect(),
        }),
    }
}
