use crate::{PipelineError, Result, Summary, Workbench};
use artifacts::{ArtifactKind, SessionStore};
use serde::{Deserialize, Serialize};
use tabular::{encode, fill_missing, Encoding, MissingStrategy};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanParams {
    pub column: String,
    #[serde(default)]
    pub missing: Option<MissingStrategy>,
    #[serde(default)]
    pub encoding: Option<Encoding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanResult {
    pub messages: Vec<String>,
    pub output: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

impl Summary for CleanResult {
    fn summary(&self) -> String {
        self.messages.join(" ")
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Treat missing values and/or encode one column of the processing
    /// artifact. The result is written as the cleaned artifact and becomes
    /// the new processing artifact.
    pub fn clean(&mut self, params: &CleanParams) -> Result<CleanResult> {
        if params.missing.is_none() && params.encoding.is_none() {
            return Err(PipelineError::invalid(
                "strategy",
                "choose a missing-value strategy or an encoding",
            ));
        }
        let (base, _, frame) = self.processing_frame()?;
        let mut frame = (*frame).clone();
        let mut messages = Vec::new();
        if let Some(strategy) = &params.missing {
            messages.push(fill_missing(&mut frame, &params.column, strategy)?);
        }
        if let Some(encoding) = params.encoding {
            messages.push(encode(&mut frame, &params.column, encoding)?);
        }

        let rows = frame.n_rows();
        let columns = frame.columns().to_vec();
        let path = self.write_frame(&base, &ArtifactKind::Cleaned, frame)?;
        self.promote(&base, &path)?;
        info!(base = %base, column = %params.column, rows, "cleaned artifact written");
        Ok(CleanResult {
            messages,
            output: self.relative(&path),
            rows,
            columns,
        })
    }
}
