use crate::resolver::check_base;
use crate::{base_name, belongs_to, ArtifactKind, Resolver, Result, SessionStore, Slot};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Current dataset identity, injected into every stage.
///
/// The active pointer names the raw upload shown as "active"; the
/// processing pointer names the artifact downstream stages actually read.
pub struct Session<S: SessionStore> {
    store: S,
    resolver: Resolver,
}

impl<S: SessionStore> Session<S> {
    pub fn new(store: S, resolver: Resolver) -> Self {
        Self { store, resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Switching to a different dataset drops the processing pointer, which
    /// belonged to the previous one.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        check_base(base_name(name))?;
        let previous = self.store.get(Slot::Active)?;
        self.store.put(Slot::Active, name)?;
        if previous.as_deref() != Some(name) {
            self.store.delete(Slot::Processing)?;
        }
        info!(dataset = name, "active dataset set");
        Ok(())
    }

    /// Reads the active pointer, clearing it when the raw file it names no
    /// longer exists.
    pub fn get_active(&mut self) -> Result<Option<String>> {
        let Some(name) = self.store.get(Slot::Active)? else {
            return Ok(None);
        };
        let raw = self
            .resolver
            .resolve(base_name(&name), &ArtifactKind::Raw)
            .ok()
            .filter(|p| p.exists());
        if raw.is_none() {
            info!(dataset = %name, "active dataset missing on disk, clearing pointer");
            self.clear_active()?;
            return Ok(None);
        }
        Ok(Some(name))
    }

    pub fn clear_active(&mut self) -> Result<()> {
        self.store.delete(Slot::Active)?;
        self.store.delete(Slot::Processing)?;
        Ok(())
    }

    pub fn is_active(&mut self, name: &str) -> Result<bool> {
        Ok(self.get_active()?.as_deref() == Some(name.trim()))
    }

    /// Base name of the active dataset, or `NoActiveDataset`.
    pub fn active_base(&mut self) -> Result<String> {
        match self.get_active()? {
            Some(name) => Ok(base_name(&name).to_string()),
            None => Err(crate::ArtifactError::NoActiveDataset),
        }
    }

    pub fn set_processing(&mut self, path: &Path) -> Result<()> {
        let rel = self
            .resolver
            .relative(path)
            .ok_or_else(|| crate::ArtifactError::InvalidName(path.display().to_string()))?;
        self.store.put(Slot::Processing, &rel)?;
        debug!(processing = %rel, "processing pointer advanced");
        Ok(())
    }

    pub fn clear_processing(&mut self) -> Result<()> {
        self.store.delete(Slot::Processing)
    }

    /// The artifact downstream stages read: the processing pointer when it
    /// exists and belongs to the active dataset, the raw upload otherwise.
    pub fn processing_path(&mut self) -> Result<PathBuf> {
        let base = self.active_base()?;
        if let Some(rel) = self.store.get(Slot::Processing)? {
            let path = self.resolver.absolute(&rel);
            let owned = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| belongs_to(&base, stem));
            if owned && path.exists() {
                return Ok(path);
            }
            debug!(processing = %rel, "stale processing pointer dropped");
            self.store.delete(Slot::Processing)?;
        }
        self.resolver.resolve(&base, &ArtifactKind::Raw)
    }

    /// Resolve `kind` for the active dataset.
    pub fn resolve(&mut self, kind: &ArtifactKind) -> Result<PathBuf> {
        match kind {
            ArtifactKind::Processing => self.processing_path(),
            other => {
                let base = self.active_base()?;
                self.resolver.resolve(&base, other)
            }
        }
    }
}
