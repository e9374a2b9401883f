//! Pointer storage for the session: the active dataset and the processing
//! artifact.

use crate::{Resolver, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Active,
    Processing,
}

pub trait SessionStore: Send + Sync {
    fn get(&self, slot: Slot) -> Result<Option<String>>;
    fn put(&mut self, slot: Slot, value: &str) -> Result<()>;
    fn delete(&mut self, slot: Slot) -> Result<()>;
}

/// Plain-text marker files, one trimmed value per slot.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    active: PathBuf,
    processing: PathBuf,
}

impl FileSessionStore {
    pub fn new(resolver: &Resolver) -> Self {
        Self {
            active: resolver.active_marker(),
            processing: resolver.processing_marker(),
        }
    }

    fn path(&self, slot: Slot) -> &PathBuf {
        match slot {
            Slot::Active => &self.active,
            Slot::Processing => &self.processing,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, slot: Slot) -> Result<Option<String>> {
        let path = self.path(slot);
        if !path.exists() {
            return Ok(None);
        }
        let value = std::fs::read_to_string(path)?;
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn put(&mut self, slot: Slot, value: &str) -> Result<()> {
        let path = self.path(slot);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, value.trim())?;
        Ok(())
    }

    fn delete(&mut self, slot: Slot) -> Result<()> {
        match std::fs::remove_file(self.path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage (for testing)
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    data: Arc<RwLock<HashMap<Slot, String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, slot: Slot) -> Result<Option<String>> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.get(&slot).cloned())
    }

    fn put(&mut self, slot: Slot, value: &str) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.insert(slot, value.trim().to_string());
        Ok(())
    }

    fn delete(&mut self, slot: Slot) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.remove(&slot);
        Ok(())
    }
}
