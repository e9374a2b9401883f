use crate::{require, Result, Stage, Summary, Workbench};
use artifacts::{ArtifactKind, ScaledPart, SessionStore, SplitPart};
use serde::Serialize;
use tabular::{Frame, Scaler, ScalerKind};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ScaleResult {
    pub scaler: ScalerKind,
    pub columns: Vec<String>,
    pub files: Vec<String>,
}

impl Summary for ScaleResult {
    fn summary(&self) -> String {
        format!("Scaled {} feature column(s)", self.columns.len())
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Fit a scaler on `X_train` only and apply it to both feature splits.
    /// The fitted parameters are kept as `splits/<base>_scaler.json`.
    pub fn scale(&mut self, kind: ScalerKind) -> Result<ScaleResult> {
        let base = self.active_base()?;
        let train_kind = ArtifactKind::Split(SplitPart::XTrain);
        let test_kind = ArtifactKind::Split(SplitPart::XTest);
        let train_path = self.resolver().resolve(&base, &train_kind)?;
        let test_path = self.resolver().resolve(&base, &test_kind)?;
        require(&train_path, Stage::Split, "X_train split")?;
        require(&test_path, Stage::Split, "X_test split")?;

        let train = self.load_frame(&base, &train_kind, &train_path)?;
        let test = self.load_frame(&base, &test_kind, &test_path)?;
        let columns = train.columns().to_vec();
        let train_data = train.numeric_matrix(&columns)?;
        let test_data = test.numeric_matrix(&columns)?;

        let scaler = Scaler::fit(kind, columns.clone(), &train_data)?;
        let scaled = [
            (ScaledPart::XTrain, scaler.transform(&train_data)?),
            (ScaledPart::XTest, scaler.transform(&test_data)?),
        ];
        let mut files = Vec::with_capacity(3);
        for (part, data) in scaled {
            let frame = Frame::from_numeric(columns.clone(), &data)?;
            let path = self.write_frame(&base, &ArtifactKind::Scaled(part), frame)?;
            files.push(self.relative(&path));
        }
        let params = self.store.save_derived(
            &base,
            &ArtifactKind::ScalerParams,
            &serde_json::to_vec_pretty(&scaler)?,
        )?;
        files.push(self.relative(&params));

        info!(base = %base, scaler = ?kind, columns = columns.len(), "features scaled");
        Ok(ScaleResult {
            scaler: kind,
            columns,
            files,
        })
    }

    /// The scaler fitted by the last `scale` run on `base`.
    pub(crate) fn load_scaler(&self, base: &str) -> Result<Scaler> {
        let path = self.resolver().resolve(base, &ArtifactKind::ScalerParams)?;
        require(&path, Stage::Scale, "scaler parameters")?;
        let bytes = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
