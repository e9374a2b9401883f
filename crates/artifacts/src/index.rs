use crate::store::atomic_write;
use crate::{Resolver, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::warn;

/// Which artifacts each dataset owns, keyed by base name.
///
/// Built incrementally as stages write output; the invalidator consults
/// it instead of guessing ownership from file names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyIndex {
    #[serde(default)]
    datasets: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing file means empty index. An unreadable one is logged and
    /// treated as empty; the directory sweep still finds its artifacts.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path)?;
        match serde_json::from_slice(&bytes) {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "dependency index unreadable, starting empty");
                Ok(Self::new())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &bytes)?;
        Ok(())
    }

    /// Record `rel` as owned by `base`. A path has one owner; re-registering
    /// under another base moves it.
    pub fn register(&mut self, base: &str, rel: &str) -> bool {
        for (owner, paths) in self.datasets.iter_mut() {
            if owner != base {
                paths.remove(rel);
            }
        }
        self.datasets.retain(|_, paths| !paths.is_empty());
        self.datasets
            .entry(base.to_string())
            .or_default()
            .insert(rel.to_string())
    }

    pub fn unregister(&mut self, rel: &str) -> bool {
        let mut removed = false;
        for paths in self.datasets.values_mut() {
            removed |= paths.remove(rel);
        }
        self.datasets.retain(|_, paths| !paths.is_empty());
        removed
    }

    pub fn owner_of(&self, rel: &str) -> Option<&str> {
        self.datasets
            .iter()
            .find(|(_, paths)| paths.contains(rel))
            .map(|(base, _)| base.as_str())
    }

    pub fn paths(&self, base: &str) -> Vec<String> {
        self.datasets
            .get(base)
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn bases(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(|k| k.as_str())
    }

    pub fn remove_base(&mut self, base: &str) -> Vec<String> {
        self.datasets
            .remove(base)
            .map(|p| p.into_iter().collect())
            .unwrap_or_default()
    }

    /// Drop entries whose files no longer exist. Returns how many went.
    pub fn repair(&mut self, resolver: &Resolver) -> usize {
        let mut dropped = 0;
        for paths in self.datasets.values_mut() {
            let before = paths.len();
            paths.retain(|rel| resolver.absolute(rel).exists());
            dropped += before - paths.len();
        }
        self.datasets.retain(|_, paths| !paths.is_empty());
        dropped
    }
}
