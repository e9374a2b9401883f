use crate::stats::{mean, pop_std_dev};
use crate::{Result, TabularError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    Standard,
    Minmax,
}

/// Per-column affine transform `(v - center) / scale`, fitted on training
/// data and stored alongside models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub kind: ScalerKind,
    pub columns: Vec<String>,
    pub center: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    /// Fit on column-major `data`. Constant columns get scale 1.
    pub fn fit(kind: ScalerKind, columns: Vec<String>, data: &[Vec<f64>]) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(TabularError::invalid("columns", "column names and data differ in length"));
        }
        let mut center = Vec::with_capacity(data.len());
        let mut scale = Vec::with_capacity(data.len());
        for (name, col) in columns.iter().zip(data) {
            if col.is_empty() {
                return Err(TabularError::NotNumeric(name.clone()));
            }
            let (c, s) = match kind {
                ScalerKind::Standard => (mean(col).unwrap_or(0.0), pop_std_dev(col).unwrap_or(0.0)),
                ScalerKind::Minmax => {
                    let min = col.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    (min, max - min)
                }
            };
            center.push(c);
            scale.push(if s.abs() < 1e-12 { 1.0 } else { s });
        }
        Ok(Self {
            kind,
            columns,
            center,
            scale,
        })
    }

    /// Fit on a single series (target scaling).
    pub fn fit_series(kind: ScalerKind, name: &str, values: &[f64]) -> Result<Self> {
        Self::fit(kind, vec![name.to_string()], &[values.to_vec()])
    }

    pub fn transform(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if data.len() != self.columns.len() {
            return Err(TabularError::invalid(
                "columns",
                format!("scaler expects {} columns, got {}", self.columns.len(), data.len()),
            ));
        }
        Ok(data
            .iter()
            .enumerate()
            .map(|(j, col)| col.iter().map(|v| (v - self.center[j]) / self.scale[j]).collect())
            .collect())
    }

    /// Undo the first column's transform; used for target scalers.
    pub fn inverse_series(&self, values: &[f64]) -> Vec<f64> {
        let (c, s) = (
            self.center.first().copied().unwrap_or(0.0),
            self.scale.first().copied().unwrap_or(1.0),
        );
        values.iter().map(|v| v * s + c).collect()
    }

    pub fn transform_series(&self, values: &[f64]) -> Vec<f64> {
        let (c, s) = (
            self.center.first().copied().unwrap_or(0.0),
            self.scale.first().copied().unwrap_or(1.0),
        );
        values.iter().map(|v| (v - c) / s).collect()
    }
}
