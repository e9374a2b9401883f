use crate::ArtifactKind;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Stamp {
    path: PathBuf,
    modified: SystemTime,
    len: u64,
}

impl Stamp {
    fn read(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            modified: meta.modified().ok()?,
            len: meta.len(),
        })
    }
}

struct Entry<T> {
    stamp: Stamp,
    value: Arc<T>,
}

/// Parsed artifacts keyed by `(base, kind)`.
///
/// An entry is only served while the file it came from still exists at
/// the same path with the same mtime and length; anything else reloads.
pub struct ArtifactCache<T> {
    entries: HashMap<(String, ArtifactKind), Entry<T>>,
}

impl<T> Default for ArtifactCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ArtifactCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<E, F>(
        &mut self,
        base: &str,
        kind: &ArtifactKind,
        path: &Path,
        load: F,
    ) -> Result<Arc<T>, E>
    where
        F: FnOnce(&Path) -> Result<T, E>,
    {
        let key = (base.to_string(), kind.clone());
        let stamp = Stamp::read(path);
        if let (Some(stamp), Some(entry)) = (&stamp, self.entries.get(&key)) {
            if entry.stamp == *stamp {
                return Ok(Arc::clone(&entry.value));
            }
        }
        self.entries.remove(&key);
        let value = Arc::new(load(path)?);
        // re-stat after load: the stamp must describe what was parsed
        if let Some(stamp) = Stamp::read(path) {
            debug!(base, path = %path.display(), "artifact cached");
            self.entries.insert(
                key,
                Entry {
                    stamp,
                    value: Arc::clone(&value),
                },
            );
        }
        Ok(value)
    }

    /// Record a value just written to `path`.
    pub fn insert(&mut self, base: &str, kind: &ArtifactKind, path: &Path, value: T) -> Arc<T> {
        let value = Arc::new(value);
        if let Some(stamp) = Stamp::read(path) {
            self.entries.insert(
                (base.to_string(), kind.clone()),
                Entry {
                    stamp,
                    value: Arc::clone(&value),
                },
            );
        }
        value
    }

    pub fn evict(&mut self, base: &str, kind: &ArtifactKind) {
        self.entries.remove(&(base.to_string(), kind.clone()));
    }

    pub fn evict_base(&mut self, base: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(b, _), _| b != base);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
