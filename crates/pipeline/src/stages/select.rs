use crate::{PipelineError, Result, Stage, Summary, Workbench};
use artifacts::{ArtifactKind, FeatureSelection, SessionStore};
use serde::{Deserialize, Serialize};
use tabular::{rank_features, validate_selection, FeatureScore};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankParams {
    pub target: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankResult {
    pub target: String,
    pub scores: Vec<FeatureScore>,
    pub plot: String,
}

impl Summary for RankResult {
    fn summary(&self) -> String {
        format!("Ranked {} features against '{}'", self.scores.len(), self.target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectParams {
    #[serde(rename = "X")]
    pub x: Vec<String>,
    #[serde(rename = "y")]
    pub y: String,
}

impl Summary for FeatureSelection {
    fn summary(&self) -> String {
        format!(
            "Selected {} predictor(s) for target '{}'",
            self.x.len(),
            self.y.as_deref().unwrap_or("")
        )
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Correlation ranking of numeric columns against `target`; the bar
    /// data is kept under `plots/` for the UI.
    pub fn rank_features(&mut self, params: &RankParams) -> Result<RankResult> {
        let (base, _, frame) = self.processing_frame()?;
        let scores = rank_features(&frame, &params.target, params.top_k)?;
        let kind = ArtifactKind::CorrelationPlot {
            target: params.target.clone(),
        };
        let path = self
            .store
            .save_derived(&base, &kind, &serde_json::to_vec_pretty(&scores)?)?;
        Ok(RankResult {
            target: params.target.clone(),
            scores,
            plot: self.relative(&path),
        })
    }

    /// Persist the predictor/target choice after checking it against the
    /// processing artifact.
    pub fn save_xy(&mut self, x: &[String], y: &str) -> Result<FeatureSelection> {
        let (base, _, frame) = self.processing_frame()?;
        validate_selection(&frame, x, y)?;
        let selection = FeatureSelection::new(x.to_vec(), y, Some(base.clone()));
        selection.save(&self.resolver().selection_file())?;
        info!(base = %base, predictors = x.len(), target = y, "feature selection saved");
        Ok(selection)
    }

    pub fn select_features(&mut self, params: &SelectParams) -> Result<FeatureSelection> {
        self.save_xy(&params.x, &params.y)
    }

    /// The stored selection; empty when none was saved.
    pub fn load_xy(&self) -> Result<FeatureSelection> {
        Ok(FeatureSelection::load(&self.resolver().selection_file())?)
    }

    /// The stored selection, required to be complete and made on `base`.
    pub(crate) fn selection_for(&self, base: &str) -> Result<(Vec<String>, String)> {
        let selection = self.load_xy()?;
        let owner_matches = selection.dataset.as_deref().map_or(true, |d| d == base);
        match (selection.is_complete() && owner_matches, selection.y) {
            (true, Some(y)) => Ok((selection.x, y)),
            _ => Err(PipelineError::missing(
                Stage::FeatureSelection,
                format!("X/y selection for '{base}'"),
            )),
        }
    }
}
