use crate::stage::require;
use crate::workbench::check_csv_name;
use crate::{ModelBundle, PipelineError, Result, Stage, Summary, Workbench};
use artifacts::{
    base_name, safe_name, ArtifactDir, ArtifactKind, ModelVersionName, SessionStore, SplitPart,
};
use serde::Serialize;
use std::path::PathBuf;
use tabular::{format_number, Frame, Metrics};
use tracing::info;

const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub dataset: String,
    pub model_key: String,
    pub version: String,
}

/// Where prediction inputs come from.
#[derive(Debug, Clone)]
pub enum PredictSource {
    /// The held-out split of the dataset the model was trained on.
    Test,
    /// A CSV supplied with the request, in raw feature units.
    Upload { name: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Preview {
    fn of(frame: &Frame) -> Self {
        let head = frame.head(PREVIEW_ROWS);
        Self {
            columns: head.columns().to_vec(),
            rows: head.rows().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResult {
    pub model_id: String,
    pub source: String,
    pub rows: usize,
    pub output: String,
    /// Stored copy of an uploaded input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    pub preview: Preview,
}

impl Summary for PredictResult {
    fn summary(&self) -> String {
        match &self.metrics {
            Some(m) => format!(
                "Predicted {} rows with {} (R2 {}, RMSE {})",
                self.rows, self.model_id, m.r2, m.rmse
            ),
            None => format!("Predicted {} rows with {}", self.rows, self.model_id),
        }
    }
}

impl Summary for Vec<ModelInfo> {
    fn summary(&self) -> String {
        format!("{} model(s) available", self.len())
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Saved model versions, newest first.
    pub fn list_models(&self, dataset: Option<&str>) -> Result<Vec<ModelInfo>> {
        let mut models = self.store.list_models(dataset)?;
        models.reverse();
        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.stem(),
                dataset: m.base,
                model_key: m.key,
                version: m.version,
            })
            .collect())
    }

    pub fn load_model(&self, model_id: &str) -> Result<ModelBundle> {
        let unknown = || PipelineError::UnknownModel(model_id.to_string());
        let name = ModelVersionName::parse(model_id).ok_or_else(unknown)?;
        let path = self.resolver().resolve(
            &name.base,
            &ArtifactKind::Model {
                key: name.key,
                version: name.version,
            },
        )?;
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(unknown()),
            Err(e) => return Err(e.into()),
        };
        ModelBundle::decode(&bytes)
    }

    /// Run a saved model. The test source reports metrics against `y_test`;
    /// uploads get a `predicted` column appended to their own columns, and
    /// their input is kept in `tmp_uploads/` once the output is written.
    pub fn predict(&mut self, model_id: &str, source: PredictSource) -> Result<PredictResult> {
        let bundle = self.load_model(model_id)?;
        let key = bundle.model_key;
        let (source_label, output_base, frame, metrics, upload) = match source {
            PredictSource::Test => {
                let (frame, metrics) = self.predict_test_split(&bundle)?;
                ("test".to_string(), bundle.dataset.clone(), frame, Some(metrics), None)
            }
            PredictSource::Upload { name, bytes } => {
                let (stem, frame) = self.predict_upload(&bundle, &name, &bytes)?;
                (name, stem.clone(), frame, None, Some((stem, bytes)))
            }
        };

        let output = self.resolver().resolve(
            &output_base,
            &ArtifactKind::Prediction {
                key: key.as_str().to_string(),
            },
        )?;
        // owned by the model's dataset so deleting it removes these too
        let csv = frame.to_csv()?;
        self.store.save_owned(&bundle.dataset, &output, csv.as_bytes())?;
        let input = match upload {
            Some((stem, bytes)) => {
                let path = self.tmp_upload_path(&stem);
                self.store.save_owned(&bundle.dataset, &path, &bytes)?;
                Some(path)
            }
            None => None,
        };
        info!(model = model_id, source = %source_label, rows = frame.n_rows(), "predictions written");
        Ok(PredictResult {
            model_id: model_id.to_string(),
            source: source_label,
            rows: frame.n_rows(),
            output: self.relative(&output),
            input: input.map(|p| self.relative(&p)),
            metrics,
            preview: Preview::of(&frame),
        })
    }

    /// Predicts from the raw `X_test` split through the scaler stored in the
    /// bundle, so rescaling after training does not change what a saved
    /// model sees.
    fn predict_test_split(&mut self, bundle: &ModelBundle) -> Result<(Frame, Metrics)> {
        let base = bundle.dataset.clone();
        let raw_kind = ArtifactKind::Split(SplitPart::XTest);
        let y_kind = ArtifactKind::Split(SplitPart::YTest);
        let raw_path = self.resolver().resolve(&base, &raw_kind)?;
        let y_path = self.resolver().resolve(&base, &y_kind)?;
        require(&raw_path, Stage::Split, "X_test split")?;
        require(&y_path, Stage::Split, "y_test split")?;

        let raw = self.load_frame(&base, &raw_kind, &raw_path)?;
        let y = self.load_frame(&base, &y_kind, &y_path)?;

        let x = raw.numeric_matrix(&bundle.features)?;
        let actual = y
            .numeric_matrix(std::slice::from_ref(&bundle.target))?
            .remove(0);
        let predicted = bundle.predict_raw(&x)?;
        let metrics = Metrics::compute(&actual, &predicted)?;

        let mut out = (*raw).clone();
        out.put_column("actual", actual.iter().map(|v| format_number(*v)).collect())?;
        out.put_column(
            "predicted",
            predicted.iter().map(|v| format_number(*v)).collect(),
        )?;
        Ok((out, metrics))
    }

    fn predict_upload(
        &mut self,
        bundle: &ModelBundle,
        name: &str,
        bytes: &[u8],
    ) -> Result<(String, Frame)> {
        check_csv_name(name)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|_| PipelineError::invalid("file", "CSV must be UTF-8 text"))?;
        let mut frame = Frame::parse_csv(text)?;
        for feature in &bundle.features {
            if !frame.has_column(feature) {
                return Err(PipelineError::ColumnNotFound(feature.clone()));
            }
        }

        let x = frame.numeric_matrix(&bundle.features)?;
        let predicted = bundle.predict_raw(&x)?;
        frame.put_column(
            "predicted",
            predicted.iter().map(|v| format_number(*v)).collect(),
        )?;
        Ok((safe_name(base_name(name)), frame))
    }

    fn tmp_upload_path(&self, stem: &str) -> PathBuf {
        self.resolver()
            .dir(ArtifactDir::TmpUploads)
            .join(format!("{}_{stem}.csv", uuid::Uuid::new_v4()))
    }
}

