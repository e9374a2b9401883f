use crate::{require, version_stamp, ModelBundle, PipelineError, Result, Stage, Summary, Workbench};
use artifacts::{ArtifactKind, ModelVersionName, ScaledPart, SessionStore, SplitPart};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tabular::{Metrics, ModelKey, Regressor, Scaler, ScalerKind, DEFAULT_RIDGE_ALPHA};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainParams {
    pub model: ModelKey,
    /// Ridge penalty; ignored by the plain linear model.
    #[serde(default)]
    pub alpha: Option<f64>,
    /// Standardise the target before fitting. Always on for `svr`.
    /// Predictions are reported on the original scale either way.
    #[serde(default)]
    pub scale_target: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainResult {
    pub model_id: String,
    pub model_key: ModelKey,
    pub metrics: Metrics,
    pub features: Vec<String>,
    pub target: String,
    pub target_scaled: bool,
    pub pruned: usize,
}

impl Summary for TrainResult {
    fn summary(&self) -> String {
        format!(
            "Trained {} (test R2 {}, RMSE {})",
            self.model_id, self.metrics.r2, self.metrics.rmse
        )
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Fit on the scaled training split, score on the scaled test split and
    /// save a new model version. Older versions beyond the retention limit
    /// are pruned.
    pub fn train(&mut self, params: &TrainParams) -> Result<TrainResult> {
        let base = self.active_base()?;
        let parts = [
            (ArtifactKind::Scaled(ScaledPart::XTrain), Stage::Scale, "scaled X_train"),
            (ArtifactKind::Scaled(ScaledPart::XTest), Stage::Scale, "scaled X_test"),
            (ArtifactKind::Split(SplitPart::YTrain), Stage::Split, "y_train split"),
            (ArtifactKind::Split(SplitPart::YTest), Stage::Split, "y_test split"),
        ];
        let mut frames = Vec::with_capacity(parts.len());
        for (kind, producer, label) in &parts {
            let path = self.resolver().resolve(&base, kind)?;
            require(&path, *producer, label)?;
            frames.push(self.load_frame(&base, kind, &path)?);
        }
        let x_scaler = self.load_scaler(&base)?;

        let features = frames[0].columns().to_vec();
        let target = frames[2]
            .columns()
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::missing(Stage::Split, "y_train split"))?;
        let x_train = frames[0].numeric_matrix(&features)?;
        let x_test = frames[1].numeric_matrix(&features)?;
        let y_train = frames[2].numeric_matrix(std::slice::from_ref(&target))?.remove(0);
        let y_test = frames[3].numeric_matrix(std::slice::from_ref(&target))?.remove(0);

        let target_scaled = params.scale_target || params.model.requires_target_scaling();
        let y_scaler = if target_scaled {
            Some(Scaler::fit_series(ScalerKind::Standard, &target, &y_train)?)
        } else {
            None
        };
        let y_fit = match &y_scaler {
            Some(s) => s.transform_series(&y_train),
            None => y_train,
        };
        let alpha = params.alpha.unwrap_or(DEFAULT_RIDGE_ALPHA);
        let model = Regressor::fit(params.model, alpha, &x_train, &y_fit)?;

        let trained_at = Utc::now();
        let mut bundle = ModelBundle {
            model_key: params.model,
            dataset: base.clone(),
            features: features.clone(),
            target: target.clone(),
            model,
            y_scaler,
            x_scaler: Some(x_scaler),
            metrics: Metrics { mse: 0.0, rmse: 0.0, mae: 0.0, r2: 0.0 },
            trained_at,
        };
        let predicted = bundle.predict_scaled(&x_test)?;
        bundle.metrics = Metrics::compute(&y_test, &predicted)?;

        let version = self.free_version(&base, params.model, &version_stamp(trained_at))?;
        let kind = ArtifactKind::Model {
            key: params.model.as_str().to_string(),
            version: version.clone(),
        };
        self.store.save_derived(&base, &kind, &bundle.encode()?)?;
        let pruned = self.store.prune_model_versions(
            &base,
            params.model.as_str(),
            self.config.model_retention,
        )?;

        let model_id = ModelVersionName {
            base: base.clone(),
            key: params.model.as_str().to_string(),
            version,
        }
        .stem();
        info!(model = %model_id, r2 = bundle.metrics.r2, pruned = pruned.len(), "model trained");
        Ok(TrainResult {
            model_id,
            model_key: params.model,
            metrics: bundle.metrics,
            features,
            target,
            target_scaled,
            pruned: pruned.len(),
        })
    }

    /// `stamp`, or the next free number after it when two trainings land in
    /// the same millisecond.
    fn free_version(&self, base: &str, key: ModelKey, stamp: &str) -> Result<String> {
        let mut version = stamp.to_string();
        loop {
            let path = self.resolver().resolve(
                base,
                &ArtifactKind::Model {
                    key: key.as_str().to_string(),
                    version: version.clone(),
                },
            )?;
            if !path.exists() {
                return Ok(version);
            }
            version = match version.parse::<u64>() {
                Ok(v) => (v + 1).to_string(),
                Err(_) => format!("{version}1"),
            };
        }
    }
}
