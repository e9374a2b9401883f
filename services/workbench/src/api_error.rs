use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pipeline::{PipelineError, StageOutcome, Summary};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub kind: &'static str,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);
pub type ApiResult<T> = Result<T, ApiFailure>;

/// HTTP status for a `PipelineError::kind()`.
pub fn status_for(kind: &str) -> StatusCode {
    match kind {
        "no_active_dataset" | "missing_prerequisite" | "unknown_dataset" | "unknown_model" => {
            StatusCode::NOT_FOUND
        }
        "dataset_limit_exceeded" => StatusCode::CONFLICT,
        "storage" | "serialization" | "internal" => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

pub fn pipeline_failure(e: PipelineError) -> ApiFailure {
    let kind = e.kind();
    (
        status_for(kind),
        Json(ApiError {
            error: e.to_string(),
            kind,
        }),
    )
}

pub fn bad_request(msg: impl Into<String>) -> ApiFailure {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: msg.into(),
            kind: "bad_request",
        }),
    )
}

pub fn join_failure(e: tokio::task::JoinError) -> ApiFailure {
    tracing::error!(error = %e, "workbench task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: "workbench task failed".to_string(),
            kind: "internal",
        }),
    )
}

/// Stage results as `{success, message, data}` bodies; domain failures keep
/// that shape with a non-2xx status, storage failures become `ApiError`.
pub fn stage_response<T: Summary + Serialize>(result: pipeline::Result<T>) -> Response {
    match StageOutcome::capture(result) {
        Ok(outcome) => {
            let status = outcome.kind.map(status_for).unwrap_or(StatusCode::OK);
            (status, Json(outcome)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "stage failed on storage");
            pipeline_failure(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::Stage;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            pipeline_failure(PipelineError::missing(Stage::Split, "X_train split")).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            pipeline_failure(PipelineError::DatasetLimitExceeded { limit: 5 }).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            pipeline_failure(PipelineError::ColumnNotFound("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(
            pipeline_failure(PipelineError::Storage(io)).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
