use crate::{Result, Summary, Workbench};
use artifacts::{ArtifactKind, SessionStore};
use serde::{Deserialize, Serialize};
use tabular::{handle_outliers, OutlierMethod, OutlierReport};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierParams {
    pub column: String,
    #[serde(flatten)]
    pub method: OutlierMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierResult {
    pub report: OutlierReport,
    pub output: String,
    pub rows: usize,
}

impl Summary for OutlierResult {
    fn summary(&self) -> String {
        format!(
            "Outlier handling applied to '{}' using {} ({} rows removed, {} values capped)",
            self.report.column, self.report.method, self.report.rows_removed, self.report.cells_capped
        )
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Apply an outlier rule to the processing artifact; the result
    /// overwrites the cleaned artifact and is promoted.
    pub fn handle_outliers(&mut self, params: &OutlierParams) -> Result<OutlierResult> {
        params.method.validate()?;
        let (base, _, frame) = self.processing_frame()?;
        let mut frame = (*frame).clone();
        let report = handle_outliers(&mut frame, &params.column, &params.method)?;

        let rows = frame.n_rows();
        let path = self.write_frame(&base, &ArtifactKind::Cleaned, frame)?;
        self.promote(&base, &path)?;
        info!(base = %base, column = %params.column, method = %report.method, rows, "outliers handled");
        Ok(OutlierResult {
            report,
            output: self.relative(&path),
            rows,
        })
    }
}
