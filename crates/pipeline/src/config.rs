use std::path::PathBuf;

pub const DEFAULT_DATA_ROOT: &str = "frontend/static";
pub const DEFAULT_MAX_DATASETS: usize = 5;
pub const DEFAULT_MODEL_RETENTION: usize = 3;

#[derive(Clone, Debug)]
pub struct WorkbenchConfig {
    /// Root of every artifact directory.
    pub data_root: PathBuf,
    /// Raw datasets retained at once; uploads beyond it are refused.
    pub max_datasets: usize,
    /// Model versions kept per (dataset, model key).
    pub model_retention: usize,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            max_datasets: DEFAULT_MAX_DATASETS,
            model_retention: DEFAULT_MODEL_RETENTION,
        }
    }
}

impl WorkbenchConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: root.into(),
            ..Self::default()
        }
    }
}
