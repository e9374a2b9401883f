use crate::store::atomic_write;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Predictor and target columns chosen by feature selection, read by split.
///
/// Serialised as `{"X": [...], "y": "..."}`; `dataset` records which base
/// the selection was made on so deleting that dataset can clear it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelection {
    #[serde(rename = "X", default)]
    pub x: Vec<String>,
    #[serde(rename = "y", default)]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
}

impl FeatureSelection {
    pub fn new(x: Vec<String>, y: impl Into<String>, dataset: Option<String>) -> Self {
        Self {
            x,
            y: Some(y.into()),
            dataset,
        }
    }

    /// Both X and y are present.
    pub fn is_complete(&self) -> bool {
        !self.x.is_empty() && self.y.as_deref().is_some_and(|y| !y.is_empty())
    }

    /// A missing file reads as an empty selection.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &bytes)?;
        Ok(())
    }

    pub fn clear(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the stored selection if it was made on `base`. Selections
    /// without a recorded dataset are left alone.
    pub fn clear_if_owned(path: &Path, base: &str) -> Result<bool> {
        let current = match Self::load(path) {
            Ok(s) => s,
            // unreadable: nothing sensible to keep
            Err(_) => {
                Self::clear(path)?;
                return Ok(true);
            }
        };
        if current.dataset.as_deref() == Some(base) {
            Self::clear(path)?;
            return Ok(true);
        }
        Ok(false)
    }
}
