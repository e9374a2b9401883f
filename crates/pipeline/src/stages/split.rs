use crate::{Result, Summary, Workbench};
use artifacts::{ArtifactKind, SessionStore, SplitPart};
use serde::Serialize;
use tabular::{split_indices, validate_selection, SplitMethod};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct SplitResult {
    pub train_rows: usize,
    pub test_rows: usize,
    pub files: Vec<String>,
}

impl Summary for SplitResult {
    fn summary(&self) -> String {
        format!(
            "Split into {} training and {} test rows",
            self.train_rows, self.test_rows
        )
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Partition the processing artifact by the saved X/y selection into the
    /// four `splits/<base>_{X,y}_{train,test}.csv` files. Scaled outputs of
    /// an earlier split are removed.
    pub fn split(&mut self, method: &SplitMethod) -> Result<SplitResult> {
        let (base, _, frame) = self.processing_frame()?;
        let (x, y) = self.selection_for(&base)?;
        validate_selection(&frame, &x, &y)?;
        let idx = split_indices(frame.n_rows(), method)?;

        let xs = frame.select(&x)?;
        let ys = frame.select(&[y])?;
        let parts = [
            (SplitPart::XTrain, xs.take_rows(&idx.train)),
            (SplitPart::XTest, xs.take_rows(&idx.test)),
            (SplitPart::YTrain, ys.take_rows(&idx.train)),
            (SplitPart::YTest, ys.take_rows(&idx.test)),
        ];
        let mut files = Vec::with_capacity(parts.len());
        for (part, data) in parts {
            let path = self.write_frame(&base, &ArtifactKind::Split(part), data)?;
            files.push(self.relative(&path));
        }
        self.drop_stale(&base, true);

        info!(
            base = %base,
            train = idx.train.len(),
            test = idx.test.len(),
            "train/test split written"
        );
        Ok(SplitResult {
            train_rows: idx.train.len(),
            test_rows: idx.test.len(),
            files,
        })
    }
}
