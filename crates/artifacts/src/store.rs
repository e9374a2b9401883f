use crate::{
    base_name, dataset_file_name, ArtifactDir, ArtifactKind, DependencyIndex, ModelVersionName,
    Resolver, Result,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Filesystem-backed artifact storage, one directory per kind.
///
/// Every derived write goes through [`ArtifactStore::save_derived`] so the
/// dependency index always knows which dataset owns the file.
pub struct ArtifactStore {
    resolver: Resolver,
    index: DependencyIndex,
}

impl ArtifactStore {
    pub fn open(resolver: Resolver) -> Result<Self> {
        for dir in ArtifactDir::ALL {
            std::fs::create_dir_all(resolver.dir(dir))?;
        }
        let index = DependencyIndex::load(&resolver.index_file())?;
        Ok(Self { resolver, index })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    pub(crate) fn index_mut(&mut self) -> &mut DependencyIndex {
        &mut self.index
    }

    pub fn persist_index(&self) -> Result<()> {
        self.index.save(&self.resolver.index_file())
    }

    /// Drop index entries whose files are gone. Returns how many went.
    pub fn repair_index(&mut self) -> Result<usize> {
        let dropped = self.index.repair(&self.resolver);
        if dropped > 0 {
            self.persist_index()?;
        }
        Ok(dropped)
    }

    /// Raw dataset file names, newest first.
    pub fn list_raw(&self) -> Result<Vec<String>> {
        let dir = self.resolver.dir(ArtifactDir::Uploads);
        let mut files: Vec<(SystemTime, String)> = Vec::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(|s| s.to_string()) else {
                continue;
            };
            if !name.ends_with(".csv") || !entry.file_type()?.is_file() {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            files.push((modified, name));
        }
        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(files.into_iter().map(|(_, name)| name).collect())
    }

    pub fn raw_count(&self) -> Result<usize> {
        Ok(self.list_raw()?.len())
    }

    pub fn raw_exists(&self, name: &str) -> bool {
        self.resolver
            .resolve(base_name(name), &ArtifactKind::Raw)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// Unique raw file name for an uploaded `original` name: spaces become
    /// `_`, the extension is normalised to `.csv`, and collisions get
    /// `(1)`, `(2)`, ... appended to the stem.
    pub fn available_name(&self, original: &str) -> String {
        let file = Path::new(original)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(original);
        let mut stem = base_name(file).trim().replace(' ', "_");
        if stem.is_empty() || stem == "." || stem == ".." {
            stem = "dataset".to_string();
        }
        let uploads = self.resolver.dir(ArtifactDir::Uploads);
        let mut candidate = dataset_file_name(&stem);
        let mut i = 1;
        while uploads.join(&candidate).exists() {
            candidate = dataset_file_name(&format!("{stem}({i})"));
            i += 1;
        }
        candidate
    }

    pub fn write_raw(&mut self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.resolver.resolve(base_name(name), &ArtifactKind::Raw)?;
        atomic_write(&path, contents)?;
        info!(dataset = name, bytes = contents.len(), "raw dataset saved");
        Ok(path)
    }

    /// Write a derived artifact and record it as owned by `base`.
    pub fn save_derived(
        &mut self,
        base: &str,
        kind: &ArtifactKind,
        contents: &[u8],
    ) -> Result<PathBuf> {
        let path = self.resolver.resolve(base, kind)?;
        atomic_write(&path, contents)?;
        self.register(base, &path)?;
        debug!(base, path = %path.display(), "derived artifact written");
        Ok(path)
    }

    /// Write to an explicit path (for names that are not a pure function of
    /// the base, such as temporary prediction inputs).
    pub fn save_owned(&mut self, base: &str, path: &Path, contents: &[u8]) -> Result<()> {
        atomic_write(path, contents)?;
        self.register(base, path)
    }

    pub fn register(&mut self, base: &str, path: &Path) -> Result<()> {
        let rel = self
            .resolver
            .relative(path)
            .ok_or_else(|| crate::ArtifactError::InvalidName(path.display().to_string()))?;
        if self.index.register(base, &rel) {
            self.persist_index()?;
        }
        Ok(())
    }

    /// Remove one file and its index entry. Missing files are not errors.
    pub fn remove(&mut self, path: &Path) -> Result<bool> {
        let existed = match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        if let Some(rel) = self.resolver.relative(path) {
            if self.index.unregister(&rel) {
                self.persist_index()?;
            }
        }
        Ok(existed)
    }

    /// Remove the listed kinds of `base`, returning the paths that existed.
    pub fn remove_kinds(&mut self, base: &str, kinds: &[ArtifactKind]) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for kind in kinds {
            let path = self.resolver.resolve(base, kind)?;
            if self.remove(&path)? {
                removed.push(path);
            }
        }
        if !removed.is_empty() {
            debug!(base, count = removed.len(), "downstream artifacts removed");
        }
        Ok(removed)
    }

    /// Model versions on disk, oldest first. `base = None` lists every
    /// dataset's models.
    pub fn list_models(&self, base: Option<&str>) -> Result<Vec<ModelVersionName>> {
        let dir = self.resolver.dir(ArtifactDir::Models);
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pkl") {
                continue;
            }
            let Some(parsed) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(ModelVersionName::parse)
            else {
                continue;
            };
            if base.is_some_and(|b| b != parsed.base) {
                continue;
            }
            out.push(parsed);
        }
        out.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.stem().cmp(&b.stem())));
        Ok(out)
    }

    /// Keep the newest `keep` versions of `(base, key)`; delete the rest.
    pub fn prune_model_versions(
        &mut self,
        base: &str,
        key: &str,
        keep: usize,
    ) -> Result<Vec<PathBuf>> {
        let versions: Vec<ModelVersionName> = self
            .list_models(Some(base))?
            .into_iter()
            .filter(|m| m.key == key)
            .collect();
        let excess = versions.len().saturating_sub(keep.max(1));
        let mut pruned = Vec::new();
        for old in versions.into_iter().take(excess) {
            let path = self.resolver.resolve(
                base,
                &ArtifactKind::Model {
                    key: old.key.clone(),
                    version: old.version.clone(),
                },
            )?;
            if self.remove(&path)? {
                info!(model = %old.stem(), "old model version pruned");
                pruned.push(path);
            }
        }
        Ok(pruned)
    }
}

/// Write to a `.tmp` sibling and rename over the target, creating parent
/// directories as needed.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}
