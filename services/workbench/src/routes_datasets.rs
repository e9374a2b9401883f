use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use pipeline::{DatasetListing, DeleteReport, UploadReceipt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api_error::{bad_request, ApiResult};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SwitchReq {
    pub name: String,
}

#[derive(Serialize)]
pub struct SwitchResp {
    pub active: String,
}

#[derive(Deserialize)]
pub struct DeleteReq {
    pub names: Vec<String>,
}

pub async fn get_datasets(State(st): State<SharedState>) -> ApiResult<Json<DatasetListing>> {
    let listing = st.call(|wb| wb.list_datasets()).await?;
    Ok(Json(listing))
}

pub async fn post_dataset(
    State(st): State<SharedState>,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<UploadReceipt>)> {
    let mut name: Option<String> = None;
    let mut file: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = mp.next_field().await.map_err(|e| bad_request(e.to_string()))? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => name = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?),
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
                file = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| bad_request("Missing file"))?;
    let name = name
        .or(file_name)
        .ok_or_else(|| bad_request("Missing file name"))?;

    let receipt = st.call(move |wb| wb.upload(&name, &bytes)).await?;
    info!(dataset = %receipt.name, "upload accepted");
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn post_active(
    State(st): State<SharedState>,
    Json(req): Json<SwitchReq>,
) -> ApiResult<Json<SwitchResp>> {
    let active = st.call(move |wb| wb.switch_dataset(&req.name)).await?;
    Ok(Json(SwitchResp { active }))
}

pub async fn delete_datasets(
    State(st): State<SharedState>,
    Json(req): Json<DeleteReq>,
) -> ApiResult<Json<DeleteReport>> {
    if req.names.is_empty() {
        return Err(bad_request("no datasets named"));
    }
    let report = st.call(move |wb| wb.delete_datasets(&req.names)).await?;
    Ok(Json(report))
}
