use axum::extract::{Multipart, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pipeline::{
    CleanParams, CompareParams, FileWorkbench, FilterParams, ModelInfo, OutlierParams,
    PredictSource, RankParams, SelectParams, SmoothParams, Summary, TrainParams, VisualizeParams,
};
use serde::{Deserialize, Serialize};
use tabular::{ModelKey, ScalerKind, SplitMethod};

use crate::api_error::{bad_request, join_failure, stage_response, ApiResult};
use crate::state::SharedState;

async fn run_stage<T, F>(st: SharedState, f: F) -> Response
where
    T: Summary + Serialize + Send + 'static,
    F: FnOnce(&mut FileWorkbench) -> pipeline::Result<T> + Send + 'static,
{
    match st.with_workbench(f).await {
        Ok(result) => stage_response(result),
        Err(e) => join_failure(e).into_response(),
    }
}

#[derive(Deserialize, Default)]
pub struct ExploreReq {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Deserialize)]
pub struct ScaleReq {
    pub scaler: ScalerKind,
}

#[derive(Deserialize)]
pub struct PredictReq {
    pub model_id: String,
}

#[derive(Deserialize)]
pub struct ModelsQuery {
    pub dataset: Option<String>,
}

pub async fn post_clean(State(st): State<SharedState>, Json(req): Json<CleanParams>) -> Response {
    run_stage(st, move |wb| wb.clean(&req)).await
}

pub async fn post_outliers(State(st): State<SharedState>, Json(req): Json<OutlierParams>) -> Response {
    run_stage(st, move |wb| wb.handle_outliers(&req)).await
}

pub async fn post_smooth(State(st): State<SharedState>, Json(req): Json<SmoothParams>) -> Response {
    run_stage(st, move |wb| wb.smooth(&req)).await
}

pub async fn post_explore(State(st): State<SharedState>, Json(req): Json<ExploreReq>) -> Response {
    run_stage(st, move |wb| wb.explore(req.refresh)).await
}

pub async fn post_filter(State(st): State<SharedState>, Json(req): Json<FilterParams>) -> Response {
    run_stage(st, move |wb| wb.filter_target(&req)).await
}

pub async fn post_rank(State(st): State<SharedState>, Json(req): Json<RankParams>) -> Response {
    run_stage(st, move |wb| wb.rank_features(&req)).await
}

pub async fn post_select(State(st): State<SharedState>, Json(req): Json<SelectParams>) -> Response {
    run_stage(st, move |wb| wb.select_features(&req)).await
}

pub async fn post_visualize(State(st): State<SharedState>, Json(req): Json<VisualizeParams>) -> Response {
    run_stage(st, move |wb| wb.visualize(&req)).await
}

pub async fn post_compare(State(st): State<SharedState>, Json(req): Json<CompareParams>) -> Response {
    run_stage(st, move |wb| wb.compare_by_target(&req)).await
}

pub async fn post_split(State(st): State<SharedState>, Json(req): Json<SplitMethod>) -> Response {
    run_stage(st, move |wb| wb.split(&req)).await
}

pub async fn post_scale(State(st): State<SharedState>, Json(req): Json<ScaleReq>) -> Response {
    run_stage(st, move |wb| wb.scale(req.scaler)).await
}

pub async fn post_train(State(st): State<SharedState>, Json(req): Json<TrainParams>) -> Response {
    run_stage(st, move |wb| wb.train(&req)).await
}

/// Predict on the model's own test split.
pub async fn post_predict(State(st): State<SharedState>, Json(req): Json<PredictReq>) -> Response {
    run_stage(st, move |wb| wb.predict(&req.model_id, PredictSource::Test)).await
}

/// Predict on a fresh CSV: multipart fields `model_id` and `file`.
pub async fn post_predict_upload(State(st): State<SharedState>, mut mp: Multipart) -> Response {
    let parsed = read_predict_upload(&mut mp).await;
    let (model_id, name, bytes) = match parsed {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };
    run_stage(st, move |wb| {
        wb.predict(&model_id, PredictSource::Upload { name, bytes })
    })
    .await
}

async fn read_predict_upload(mp: &mut Multipart) -> ApiResult<(String, String, Vec<u8>)> {
    let mut model_id: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = mp.next_field().await.map_err(|e| bad_request(e.to_string()))? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("model_id") => {
                model_id = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?)
            }
            Some("file") => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
                file = Some((name, bytes.to_vec()));
            }
            _ => {}
        }
    }
    let model_id = model_id.ok_or_else(|| bad_request("Missing model_id"))?;
    let (name, bytes) = file.ok_or_else(|| bad_request("Missing file"))?;
    Ok((model_id, name, bytes))
}

pub async fn get_models(
    State(st): State<SharedState>,
    Query(q): Query<ModelsQuery>,
) -> ApiResult<Json<Vec<ModelInfo>>> {
    let models = st.call(move |wb| wb.list_models(q.dataset.as_deref())).await?;
    Ok(Json(models))
}

#[derive(Serialize)]
pub struct AvailableModel {
    pub key: ModelKey,
    pub label: &'static str,
    pub scales_target: bool,
}

pub async fn get_available_models() -> Json<Vec<AvailableModel>> {
    Json(
        ModelKey::ALL
            .into_iter()
            .map(|key| AvailableModel {
                key,
                label: key.label(),
                scales_target: key.requires_target_scaling(),
            })
            .collect(),
    )
}
