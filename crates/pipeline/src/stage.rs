use crate::{PipelineError, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Pipeline steps in their fixed forward order. A stage only reads
/// artifacts written by stages before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Clean,
    Outliers,
    Smooth,
    Explore,
    FeatureSelection,
    Split,
    Scale,
    Train,
    Predict,
}

impl Stage {
    pub const ORDER: [Stage; 10] = [
        Stage::Upload,
        Stage::Clean,
        Stage::Outliers,
        Stage::Smooth,
        Stage::Explore,
        Stage::FeatureSelection,
        Stage::Split,
        Stage::Scale,
        Stage::Train,
        Stage::Predict,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Clean => "clean",
            Stage::Outliers => "outlier handling",
            Stage::Smooth => "smoothing",
            Stage::Explore => "explore",
            Stage::FeatureSelection => "feature selection",
            Stage::Split => "split",
            Stage::Scale => "scale",
            Stage::Train => "train",
            Stage::Predict => "predict",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fail with `MissingPrerequisite` naming `producer` when `path` is absent.
pub fn require(path: &Path, producer: Stage, artifact: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::missing(producer, artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_forward_only() {
        let mut sorted = Stage::ORDER;
        sorted.sort();
        assert_eq!(sorted, Stage::ORDER);
        assert!(Stage::Scale < Stage::Train);
    }

    #[test]
    fn test_require_names_the_producing_stage() {
        let err = require(Path::new("/nonexistent/A_X_train.csv"), Stage::Split, "X_train split")
            .unwrap_err();
        assert_eq!(err.to_string(), "missing X_train split; run the split step first");
    }
}
