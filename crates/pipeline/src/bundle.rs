use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabular::{Metrics, ModelKey, Regressor, Scaler};

/// Everything needed to predict with a trained model, stored as one
/// bincode file per version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model_key: ModelKey,
    pub dataset: String,
    pub features: Vec<String>,
    pub target: String,
    pub model: Regressor,
    pub y_scaler: Option<Scaler>,
    pub x_scaler: Option<Scaler>,
    pub metrics: Metrics,
    pub trained_at: DateTime<Utc>,
}

impl ModelBundle {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Predict from already-scaled features, undoing target scaling.
    pub fn predict_scaled(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let raw = self.model.predict(x)?;
        Ok(match &self.y_scaler {
            Some(s) => s.inverse_series(&raw),
            None => raw,
        })
    }

    /// Predict from raw feature values, applying the stored feature scaler.
    pub fn predict_raw(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        match &self.x_scaler {
            Some(s) => {
                let scaled = s.transform(x)?;
                self.predict_scaled(&scaled)
            }
            None => self.predict_scaled(x),
        }
    }
}

/// Millisecond UTC timestamp used as the model version.
pub fn version_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S%3f").to_string()
}
