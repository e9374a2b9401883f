mod api_error;
mod config;
mod routes_datasets;
mod routes_stages;
mod state;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use pipeline::FileWorkbench;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::state::{AppState, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    let workbench = FileWorkbench::open(cfg.workbench())
        .with_context(|| format!("Failed to open data root {}", cfg.data_root.display()))?;
    info!(
        root = %cfg.data_root.display(),
        max_datasets = cfg.max_datasets,
        retention = cfg.model_retention,
        "workbench opened"
    );

    let app = router(Arc::new(AppState::new(workbench)));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, "workbench listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn router(state: SharedState) -> Router {
    use crate::routes_datasets as datasets;
    use crate::routes_stages as stages;

    Router::new()
        .route(
            "/datasets",
            get(datasets::get_datasets)
                .post(datasets::post_dataset)
                .delete(datasets::delete_datasets),
        )
        .route("/datasets/active", post(datasets::post_active))
        .route("/stages/clean", post(stages::post_clean))
        .route("/stages/outliers", post(stages::post_outliers))
        .route("/stages/smooth", post(stages::post_smooth))
        .route("/stages/explore", post(stages::post_explore))
        .route("/stages/filter", post(stages::post_filter))
        .route("/stages/rank", post(stages::post_rank))
        .route("/stages/select", post(stages::post_select))
        .route("/stages/visualize", post(stages::post_visualize))
        .route("/stages/compare", post(stages::post_compare))
        .route("/stages/split", post(stages::post_split))
        .route("/stages/scale", post(stages::post_scale))
        .route("/stages/train", post(stages::post_train))
        .route("/stages/predict", post(stages::post_predict))
        .route("/stages/predict/upload", post(stages::post_predict_upload))
        .route("/models", get(stages::get_models))
        .route("/models/available", get(stages::get_available_models))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
