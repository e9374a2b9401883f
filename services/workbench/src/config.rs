use anyhow::{bail, Context, Result};
use pipeline::WorkbenchConfig;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_root: PathBuf,
    pub max_datasets: usize,
    pub model_retention: usize,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = WorkbenchConfig::default();
        let data_root = lookup("WORKBENCH_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_root);
        let max_datasets = count(&lookup, "WORKBENCH_MAX_DATASETS", defaults.max_datasets)?;
        let model_retention =
            count(&lookup, "WORKBENCH_MODEL_RETENTION", defaults.model_retention)?;
        let bind_addr =
            lookup("WORKBENCH_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        if data_root.as_os_str().is_empty() {
            bail!("WORKBENCH_DATA_ROOT must not be empty");
        }

        Ok(Self {
            data_root,
            max_datasets,
            model_retention,
            bind_addr,
        })
    }

    pub fn workbench(&self) -> WorkbenchConfig {
        WorkbenchConfig {
            data_root: self.data_root.clone(),
            max_datasets: self.max_datasets,
            model_retention: self.model_retention,
        }
    }
}

/// Positive integer env var, or `default` when unset.
fn count(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let n: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))?;
    if n == 0 {
        bail!("{key} must be at least 1");
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = from(&[]).unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("frontend/static"));
        assert_eq!(cfg.max_datasets, 5);
        assert_eq!(cfg.model_retention, 3);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides_and_rejects() {
        let cfg = from(&[("WORKBENCH_MAX_DATASETS", "8"), ("WORKBENCH_DATA_ROOT", "/srv/wb")]).unwrap();
        assert_eq!(cfg.max_datasets, 8);
        assert_eq!(cfg.workbench().data_root, PathBuf::from("/srv/wb"));

        assert!(from(&[("WORKBENCH_MAX_DATASETS", "0")]).is_err());
        assert!(from(&[("WORKBENCH_MODEL_RETENTION", "three")]).is_err());
    }
}
