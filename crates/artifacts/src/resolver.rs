use crate::{ArtifactDir, ArtifactError, ArtifactKind, Result};
use std::path::{Path, PathBuf};

/// Maps `(base_name, kind)` to a canonical path under the data root.
///
/// Never writes; existence checks are left to callers.
#[derive(Clone, Debug)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, dir: ArtifactDir) -> PathBuf {
        self.root.join(dir.as_str())
    }

    /// Path of `kind` for dataset `base`. `Processing` resolves to the raw
    /// file here; the session overrides it when its pointer is valid.
    pub fn resolve(&self, base: &str, kind: &ArtifactKind) -> Result<PathBuf> {
        check_base(base)?;
        Ok(self.dir(kind.dir()).join(kind.file_name(base)))
    }

    /// Root-relative form with `/` separators, as stored in pointers and
    /// the dependency index.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel.iter().filter_map(|p| p.to_str()).collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }

    pub fn absolute(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|p| !p.is_empty())
            .fold(self.root.clone(), |acc, p| acc.join(p))
    }

    pub fn active_marker(&self) -> PathBuf {
        self.dir(ArtifactDir::Uploads).join(crate::ACTIVE_MARKER)
    }

    pub fn processing_marker(&self) -> PathBuf {
        self.dir(ArtifactDir::Cleaned).join(crate::PROCESSING_MARKER)
    }

    pub fn selection_file(&self) -> PathBuf {
        self.root.join(crate::SELECTION_FILE)
    }

    pub fn index_file(&self) -> PathBuf {
        self.root.join(crate::INDEX_FILE)
    }
}

/// An empty base means no dataset is selected; anything that could escape
/// its directory is rejected outright.
pub fn check_base(base: &str) -> Result<()> {
    if base.trim().is_empty() {
        return Err(ArtifactError::NoActiveDataset);
    }
    if base.contains('/') || base.contains('\\') || base == "." || base == ".." {
        return Err(ArtifactError::InvalidName(base.to_string()));
    }
    Ok(())
}
