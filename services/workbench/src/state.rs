use pipeline::FileWorkbench;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinError;

use crate::api_error::{join_failure, pipeline_failure, ApiResult};

pub type SharedState = Arc<AppState>;

/// One workbench per process. Every stage mutates the session pointers or
/// the artifact index, so handlers take the write lock one at a time.
#[derive(Clone)]
pub struct AppState {
    workbench: Arc<RwLock<FileWorkbench>>,
}

impl AppState {
    pub fn new(workbench: FileWorkbench) -> Self {
        Self {
            workbench: Arc::new(RwLock::new(workbench)),
        }
    }

    /// Run `f` on the blocking pool with the workbench locked; stages do
    /// file IO and model fitting.
    pub async fn with_workbench<R, F>(&self, f: F) -> Result<R, JoinError>
    where
        R: Send + 'static,
        F: FnOnce(&mut FileWorkbench) -> R + Send + 'static,
    {
        let workbench = Arc::clone(&self.workbench);
        tokio::task::spawn_blocking(move || {
            let mut guard = workbench.blocking_write();
            f(&mut *guard)
        })
        .await
    }

    /// [`AppState::with_workbench`] for calls whose pipeline error becomes
    /// the response.
    pub async fn call<R, F>(&self, f: F) -> ApiResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut FileWorkbench) -> pipeline::Result<R> + Send + 'static,
    {
        self.with_workbench(f)
            .await
            .map_err(join_failure)?
            .map_err(pipeline_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use pipeline::WorkbenchConfig;

    fn state(root: &std::path::Path) -> AppState {
        AppState::new(FileWorkbench::open(WorkbenchConfig::with_root(root)).unwrap())
    }

    #[tokio::test]
    async fn test_call_runs_against_the_shared_workbench() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path());
        st.call(|wb| wb.upload("A.csv", b"x,y\n1,2\n3,4\n")).await.unwrap();
        let active = st.call(|wb| wb.active_dataset()).await.unwrap();
        assert_eq!(active.as_deref(), Some("A.csv"));
    }

    #[tokio::test]
    async fn test_call_maps_pipeline_errors() {
        let dir = tempfile::tempdir().unwrap();
        let st = state(dir.path());
        let (status, body) = st.call(|wb| wb.explore(false)).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.kind, "no_active_dataset");
    }
}
