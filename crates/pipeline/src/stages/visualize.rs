use crate::{Result, Summary, Workbench};
use artifacts::{ArtifactKind, SessionStore};
use serde::{Deserialize, Serialize};
use tabular::{
    compare_by_target, visualize, PlotKind, TargetComparison, Visualization, DEFAULT_SCATTER_LIMIT,
};
use tracing::info;

fn default_limit() -> usize {
    DEFAULT_SCATTER_LIMIT
}

fn default_lower() -> f64 {
    25.0
}

fn default_upper() -> f64 {
    75.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizeParams {
    pub columns: Vec<String>,
    pub plots: Vec<PlotKind>,
    /// Rows shown in a single-column scatter.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualizeResult {
    #[serde(flatten)]
    pub data: Visualization,
    pub plot: String,
}

impl Summary for VisualizeResult {
    fn summary(&self) -> String {
        let scatter = usize::from(self.data.scatter.is_some());
        format!(
            "Plotted {} ({} scatter, {} histogram(s))",
            self.data.columns.join(", "),
            scatter,
            self.data.histograms.len()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareParams {
    pub target: String,
    pub features: Vec<String>,
    #[serde(default = "default_lower")]
    pub lower: f64,
    #[serde(default = "default_upper")]
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    #[serde(flatten)]
    pub data: TargetComparison,
    pub plot: String,
}

impl Summary for CompareResult {
    fn summary(&self) -> String {
        format!(
            "Compared {} feature(s) below the {}th and above the {}th percentile of '{}'",
            self.data.features.len(),
            self.data.lower_percentile,
            self.data.upper_percentile,
            self.data.target
        )
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Scatter and histogram data for one or two columns of the processing
    /// artifact, saved under `plots/`.
    pub fn visualize(&mut self, params: &VisualizeParams) -> Result<VisualizeResult> {
        let (base, _, frame) = self.processing_frame()?;
        let data = visualize(&frame, &params.columns, &params.plots, params.limit)?;
        let kind = ArtifactKind::VisualizePlot {
            columns: params.columns.join("-"),
        };
        let path = self
            .store
            .save_derived(&base, &kind, &serde_json::to_vec_pretty(&data)?)?;
        info!(base = %base, columns = ?params.columns, "plot data written");
        Ok(VisualizeResult {
            data,
            plot: self.relative(&path),
        })
    }

    /// Feature distributions for rows at the low and high ends of the
    /// target, saved under `plots/`.
    pub fn compare_by_target(&mut self, params: &CompareParams) -> Result<CompareResult> {
        let (base, _, frame) = self.processing_frame()?;
        let data = compare_by_target(
            &frame,
            &params.target,
            &params.features,
            params.lower,
            params.upper,
        )?;
        let kind = ArtifactKind::ComparisonPlot {
            target: params.target.clone(),
        };
        let path = self
            .store
            .save_derived(&base, &kind, &serde_json::to_vec_pretty(&data)?)?;
        info!(base = %base, target = %params.target, "comparison data written");
        Ok(CompareResult {
            data,
            plot: self.relative(&path),
        })
    }
}
