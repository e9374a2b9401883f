use crate::{Result, Summary, Workbench};
use artifacts::{ArtifactKind, SessionStore};
use serde::{Deserialize, Serialize};
use tabular::{smooth_column, SmoothMethod};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothParams {
    pub column: String,
    #[serde(flatten)]
    pub method: SmoothMethod,
    /// Start a fresh comparison instead of adding to the current one.
    #[serde(default)]
    pub clear: bool,
    /// Make the smoothed output the processing artifact.
    #[serde(default)]
    pub promote: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothRun {
    pub method: String,
    pub column: String,
    pub output: String,
}

/// Smoothing runs shown side by side for one (dataset, column) pair.
/// Changing either, or asking to clear, starts over.
#[derive(Debug, Default)]
pub struct SmoothingRuns {
    key: Option<(String, String)>,
    runs: Vec<SmoothRun>,
}

impl SmoothingRuns {
    fn record(&mut self, base: &str, column: &str, clear: bool, run: SmoothRun) -> Vec<SmoothRun> {
        let key = (base.to_string(), column.to_string());
        if clear || self.key.as_ref() != Some(&key) {
            debug!(base, column, "smoothing runs reset");
            self.runs.clear();
            self.key = Some(key);
        }
        // same method again replaces its earlier run
        self.runs.retain(|r| r.method != run.method);
        self.runs.push(run);
        self.runs.clone()
    }

    pub fn runs(&self) -> &[SmoothRun] {
        &self.runs
    }

    pub fn forget(&mut self, base: &str) {
        if self.key.as_ref().is_some_and(|(b, _)| b == base) {
            self.key = None;
            self.runs.clear();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SmoothResult {
    pub column: String,
    pub output: String,
    pub runs: Vec<SmoothRun>,
    pub promoted: bool,
}

impl Summary for SmoothResult {
    fn summary(&self) -> String {
        let mut msg = format!("Added smoothed column '{}'", self.column);
        if self.promoted {
            msg.push_str(" and made it the working dataset");
        }
        msg
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Smooth a column of the processing artifact into
    /// `processed/<base>_<column>_<method>.csv`.
    pub fn smooth(&mut self, params: &SmoothParams) -> Result<SmoothResult> {
        params.method.validate()?;
        let (base, _, frame) = self.processing_frame()?;
        let mut frame = (*frame).clone();
        let new_column = smooth_column(&mut frame, &params.column, &params.method)?;

        let kind = ArtifactKind::Smoothed {
            column: params.column.clone(),
            method: params.method.name().to_string(),
        };
        let path = self.write_frame(&base, &kind, frame)?;
        if params.promote {
            self.promote(&base, &path)?;
        }
        let output = self.relative(&path);
        let runs = self.smoothing.record(
            &base,
            &params.column,
            params.clear,
            SmoothRun {
                method: params.method.name().to_string(),
                column: new_column.clone(),
                output: output.clone(),
            },
        );
        info!(base = %base, column = %new_column, promoted = params.promote, "smoothing written");
        Ok(SmoothResult {
            column: new_column,
            output,
            runs,
            promoted: params.promote,
        })
    }

    pub fn smoothing_runs(&self) -> &[SmoothRun] {
        self.smoothing.runs()
    }
}
