//! Regression models and evaluation metrics.
//!
//! Linear, ridge and support-vector models are fitted with linfa; the
//! tree models live in [`crate::tree`]. Every fitted model is plain data so
//! it can be stored inside a model bundle.

use crate::stats::round_to;
use crate::tree::{check_shape, check_width, RandomForest, RegressionTree, TreeParams};
use crate::tree::{FOREST_SEED, FOREST_TREES};
use crate::{Result, TabularError};
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_elasticnet::ElasticNet;
use linfa_linear::LinearRegression;
use linfa_svm::Svm;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_RIDGE_ALPHA: f64 = 1.0;

const SVR_C: f64 = 1.0;
const SVR_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKey {
    Linear,
    Ridge,
    Dtr,
    Rf,
    Svr,
}

impl ModelKey {
    pub const ALL: [ModelKey; 5] = [
        ModelKey::Linear,
        ModelKey::Ridge,
        ModelKey::Dtr,
        ModelKey::Rf,
        ModelKey::Svr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKey::Linear => "linear",
            ModelKey::Ridge => "ridge",
            ModelKey::Dtr => "dtr",
            ModelKey::Rf => "rf",
            ModelKey::Svr => "svr",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelKey::Linear => "Linear Regression",
            ModelKey::Ridge => "Ridge Regression",
            ModelKey::Dtr => "Decision Tree",
            ModelKey::Rf => "Random Forest",
            ModelKey::Svr => "Support Vector Regression",
        }
    }

    /// The RBF support-vector model is fitted on a standardised target
    /// whatever the caller asks for.
    pub fn requires_target_scaling(&self) -> bool {
        matches!(self, ModelKey::Svr)
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKey {
    type Err = TabularError;

    fn from_str(s: &str) -> Result<Self> {
        ModelKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TabularError::invalid("model", format!("unknown model key '{s}'")))
    }
}

/// `y = intercept + coefficients . x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub alpha: f64,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        check_width(self.coefficients.len(), x)?;
        let weights = Array1::from(self.coefficients.clone());
        Ok(records(x)
            .dot(&weights)
            .mapv(|v| v + self.intercept)
            .to_vec())
    }
}

/// Epsilon-SVR with an RBF kernel. linfa's fitted `Svm` is not kept; the
/// training set is, and the solver is rerun (deterministically) on predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvrFit {
    pub c: f64,
    pub epsilon: f64,
    /// linfa's gaussian kernel is `exp(-|a - b|^2 / width)`.
    pub kernel_width: f64,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl SvrFit {
    fn new(x: &[Vec<f64>], y: &[f64]) -> Self {
        // 1 / gamma with gamma = 1 / (n_features * var(X))
        let values: Vec<f64> = x.iter().flatten().copied().collect();
        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let width = x.len() as f64 * var;
        Self {
            c: SVR_C,
            epsilon: SVR_EPSILON,
            kernel_width: if width > 0.0 { width } else { 1.0 },
            x: x.to_vec(),
            y: y.to_vec(),
        }
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        check_width(self.x.len(), x)?;
        let train = Dataset::new(records(&self.x), Array1::from(self.y.clone()));
        let svm = Svm::<f64, f64>::params()
            .c_svr(self.c, Some(self.epsilon))
            .gaussian_kernel(self.kernel_width)
            .fit(&train)
            .map_err(fit_error)?;
        let predicted: Array1<f64> = svm.predict(&records(x));
        Ok(predicted.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Regressor {
    Linear(LinearFit),
    Tree(RegressionTree),
    Forest(RandomForest),
    Svr(SvrFit),
}

impl Regressor {
    /// Fit the model named by `key`. `alpha` is the ridge penalty and is
    /// ignored by the other models. `x` is column-major.
    pub fn fit(key: ModelKey, alpha: f64, x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        check_shape(x, y)?;
        if y.len() < 2 {
            return Err(TabularError::InsufficientRows {
                needed: 2,
                found: y.len(),
            });
        }
        match key {
            ModelKey::Linear => {
                let data = Dataset::new(records(x), Array1::from(y.to_vec()));
                let fitted = LinearRegression::new().fit(&data).map_err(fit_error)?;
                Ok(Regressor::Linear(LinearFit {
                    alpha: 0.0,
                    intercept: fitted.intercept(),
                    coefficients: fitted.params().to_vec(),
                }))
            }
            ModelKey::Ridge => {
                if !alpha.is_finite() || alpha < 0.0 {
                    return Err(TabularError::invalid("alpha", "must be a non-negative number"));
                }
                let data = Dataset::new(records(x), Array1::from(y.to_vec()));
                let fitted = ElasticNet::<f64>::params()
                    .penalty(alpha)
                    .l1_ratio(0.0)
                    .fit(&data)
                    .map_err(fit_error)?;
                Ok(Regressor::Linear(LinearFit {
                    alpha,
                    intercept: fitted.intercept(),
                    coefficients: fitted.hyperplane().to_vec(),
                }))
            }
            ModelKey::Dtr => Ok(Regressor::Tree(RegressionTree::fit(
                TreeParams::default(),
                x,
                y,
            )?)),
            ModelKey::Rf => Ok(Regressor::Forest(RandomForest::fit(
                TreeParams::default(),
                FOREST_TREES,
                FOREST_SEED,
                x,
                y,
            )?)),
            ModelKey::Svr => Ok(Regressor::Svr(SvrFit::new(x, y))),
        }
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            Regressor::Linear(m) => m.predict(x),
            Regressor::Tree(m) => m.predict(x),
            Regressor::Forest(m) => m.predict(x),
            Regressor::Svr(m) => m.predict(x),
        }
    }
}

/// Row-major ndarray view of column-major data.
fn records(x: &[Vec<f64>]) -> Array2<f64> {
    let n = x.first().map(|c| c.len()).unwrap_or(0);
    Array2::from_shape_fn((n, x.len()), |(r, c)| x[c][r])
}

fn fit_error(e: impl fmt::Display) -> TabularError {
    TabularError::Fit(e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl Metrics {
    /// Regression metrics rounded to three decimals.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() || actual.is_empty() {
            return Err(TabularError::invalid(
                "y",
                "actual and predicted values must be non-empty and the same length",
            ));
        }
        let n = actual.len() as f64;
        let mse = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n;
        let mae = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
        let mean = actual.iter().sum::<f64>() / n;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let ss_res = mse * n;
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };
        Ok(Self {
            mse: round_to(mse, 3),
            rmse: round_to(mse.sqrt(), 3),
            mae: round_to(mae, 3),
            r2: round_to(r2, 3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x1: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let x2: Vec<f64> = (0..12).map(|i| ((i * 7) % 5) as f64).collect();
        let y: Vec<f64> = x1.iter().zip(&x2).map(|(a, b)| 3.0 + 2.0 * a - 0.5 * b).collect();
        (vec![x1, x2], y)
    }

    #[test]
    fn test_ols_recovers_exact_plane() {
        let (x, y) = plane();
        let Regressor::Linear(m) = Regressor::fit(ModelKey::Linear, 0.0, &x, &y).unwrap() else {
            panic!("expected a linear fit");
        };
        assert!((m.intercept - 3.0).abs() < 1e-6);
        assert!((m.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((m.coefficients[1] + 0.5).abs() < 1e-6);
        let metrics = Metrics::compute(&y, &m.predict(&x).unwrap()).unwrap();
        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 4.0 * v).collect();
        let coefficient = |key, alpha| match Regressor::fit(key, alpha, &[x.clone()], &y).unwrap() {
            Regressor::Linear(m) => m.coefficients[0],
            other => panic!("expected a linear fit, got {other:?}"),
        };
        let ols = coefficient(ModelKey::Linear, 0.0);
        let ridge = coefficient(ModelKey::Ridge, 10.0);
        assert!(ridge.abs() < ols.abs());
    }

    #[test]
    fn test_negative_alpha_rejected() {
        let (x, y) = plane();
        assert!(matches!(
            Regressor::fit(ModelKey::Ridge, -1.0, &x, &y),
            Err(TabularError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_tree_models_fit_a_step() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| if *v < 10.0 { 0.0 } else { 10.0 }).collect();
        for key in [ModelKey::Dtr, ModelKey::Rf] {
            let model = Regressor::fit(key, 0.0, &[x.clone()], &y).unwrap();
            let pred = model.predict(&[vec![2.0, 17.0]]).unwrap();
            assert!(pred[0] < 5.0 && pred[1] > 5.0, "{key}: {pred:?}");
        }
    }

    #[test]
    fn test_svr_tracks_a_smooth_target() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 / 10.0 - 1.5).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.8 * v).collect();
        let model = Regressor::fit(ModelKey::Svr, 0.0, &[x.clone()], &y).unwrap();
        let pred = model.predict(&[x]).unwrap();
        let metrics = Metrics::compute(&y, &pred).unwrap();
        assert!(metrics.r2 > 0.8, "{metrics:?}");
    }

    #[test]
    fn test_metrics_rounding() {
        let m = Metrics::compute(&[1.0, 2.0, 3.0], &[1.1, 1.9, 3.2]).unwrap();
        assert_eq!(m.mse, 0.02);
        assert_eq!(m.mae, 0.133);
        assert_eq!(m.rmse, 0.141);
        assert_eq!(m.r2, 0.97);
    }

    #[test]
    fn test_model_key_parse() {
        assert_eq!("ridge".parse::<ModelKey>().unwrap(), ModelKey::Ridge);
        assert_eq!("svr".parse::<ModelKey>().unwrap(), ModelKey::Svr);
        assert!("mlp".parse::<ModelKey>().is_err());
        assert!(ModelKey::Svr.requires_target_scaling());
        assert!(!ModelKey::Rf.requires_target_scaling());
    }
}
