use crate::stages::smooth::SmoothingRuns;
use crate::{PipelineError, Result, Summary, WorkbenchConfig};
use artifacts::{
    base_name, ArtifactCache, ArtifactKind, ArtifactStore, FileSessionStore, Resolver, Session,
    SessionStore,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabular::Frame;
use tracing::{info, warn};

/// The staged pipeline over one data root.
///
/// Holds the injected session (active and processing pointers), the
/// artifact store with its dependency index, and a revalidating frame
/// cache. Every stage resolves its input through here.
pub struct Workbench<S: SessionStore> {
    pub(crate) config: WorkbenchConfig,
    pub(crate) session: Session<S>,
    pub(crate) store: ArtifactStore,
    pub(crate) frames: ArtifactCache<Frame>,
    pub(crate) smoothing: SmoothingRuns,
}

pub type FileWorkbench = Workbench<FileSessionStore>;

impl Workbench<FileSessionStore> {
    /// Pointers persisted as marker files under the data root.
    pub fn open(config: WorkbenchConfig) -> Result<Self> {
        let sessions = FileSessionStore::new(&Resolver::new(&config.data_root));
        Self::with_session(config, sessions)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetListing {
    pub datasets: Vec<String>,
    pub active: Option<String>,
    pub limit: usize,
    pub can_upload: bool,
}

impl Summary for DatasetListing {
    fn summary(&self) -> String {
        format!("{} of {} datasets stored", self.datasets.len(), self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub hash: String,
}

impl Summary for UploadReceipt {
    fn summary(&self) -> String {
        format!(
            "Uploaded '{}' ({} rows, {} columns)",
            self.name,
            self.rows,
            self.columns.len()
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub artifacts_removed: usize,
    pub failures: Vec<String>,
    pub active_cleared: bool,
}

impl Summary for DeleteReport {
    fn summary(&self) -> String {
        let mut msg = format!(
            "Deleted {} dataset(s) and {} derived artifact(s)",
            self.deleted.len(),
            self.artifacts_removed
        );
        if !self.failures.is_empty() {
            msg.push_str(&format!("; {} file(s) could not be removed", self.failures.len()));
        }
        msg
    }
}

impl<S: SessionStore> Workbench<S> {
    pub fn with_session(config: WorkbenchConfig, sessions: S) -> Result<Self> {
        let resolver = Resolver::new(&config.data_root);
        let mut store = ArtifactStore::open(resolver.clone())?;
        let dropped = store.repair_index()?;
        if dropped > 0 {
            info!(dropped, "dependency index repaired on open");
        }
        Ok(Self {
            config,
            session: Session::new(sessions, resolver),
            store,
            frames: ArtifactCache::new(),
            smoothing: SmoothingRuns::default(),
        })
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver {
        self.store.resolver()
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn active_dataset(&mut self) -> Result<Option<String>> {
        Ok(self.session.get_active()?)
    }

    /// Path the next stage would read.
    pub fn processing_path(&mut self) -> Result<PathBuf> {
        Ok(self.session.processing_path()?)
    }

    pub fn list_datasets(&mut self) -> Result<DatasetListing> {
        let datasets = self.store.list_raw()?;
        let active = self.session.get_active()?;
        Ok(DatasetListing {
            can_upload: datasets.len() < self.config.max_datasets,
            datasets,
            active,
            limit: self.config.max_datasets,
        })
    }

    /// Store an uploaded CSV under a fresh unique name and make it active.
    pub fn upload(&mut self, original_name: &str, bytes: &[u8]) -> Result<UploadReceipt> {
        check_csv_name(original_name)?;
        let count = self.store.raw_count()?;
        if count >= self.config.max_datasets {
            return Err(PipelineError::DatasetLimitExceeded {
                limit: self.config.max_datasets,
            });
        }
        let text = std::str::from_utf8(bytes)
            .map_err(|_| PipelineError::invalid("file", "CSV must be UTF-8 text"))?;
        let frame = Frame::parse_csv(text)?;
        if frame.n_rows() == 0 {
            return Err(PipelineError::invalid("file", "CSV has a header but no rows"));
        }

        let name = self.store.available_name(original_name);
        let base = base_name(&name).to_string();
        // leftovers from an earlier dataset of the same name
        let stale = self.store.invalidate(&base);
        if !stale.removed.is_empty() {
            warn!(base = %base, removed = stale.removed.len(), "stale artifacts cleared before upload");
        }
        self.frames.evict_base(&base);

        let path = self.store.write_raw(&name, bytes)?;
        self.frames.insert(&base, &ArtifactKind::Processing, &path, frame.clone());
        self.session.set_active(&name)?;

        let hash = hex::encode(blake3::hash(bytes).as_bytes());
        info!(dataset = %name, rows = frame.n_rows(), hash = %hash, "dataset uploaded");
        Ok(UploadReceipt {
            name,
            rows: frame.n_rows(),
            columns: frame.columns().to_vec(),
            hash,
        })
    }

    pub fn switch_dataset(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if !self.store.list_raw()?.iter().any(|n| n == name) {
            return Err(PipelineError::UnknownDataset(name.to_string()));
        }
        self.session.set_active(name)?;
        Ok(name.to_string())
    }

    /// Remove raw datasets and cascade to everything derived from them.
    /// Per-file failures are reported, never fatal.
    pub fn delete_datasets(&mut self, names: &[String]) -> Result<DeleteReport> {
        let active = self.session.get_active()?;
        let mut report = DeleteReport::default();
        for name in names {
            let name = name.trim();
            let base = base_name(name).to_string();
            let raw = match self.resolver().resolve(&base, &ArtifactKind::Raw) {
                Ok(p) => p,
                Err(e) => {
                    report.failures.push(format!("{name}: {e}"));
                    continue;
                }
            };
            match self.store.remove(&raw) {
                Ok(true) => report.deleted.push(name.to_string()),
                Ok(false) => warn!(dataset = name, "raw dataset already gone, cascading anyway"),
                Err(e) => {
                    warn!(dataset = name, error = %e, "raw dataset not removed");
                    report.failures.push(format!("{}: {e}", raw.display()));
                }
            }
            let cascade = self.store.invalidate(&base);
            report.artifacts_removed += cascade.removed.len();
            report.failures.extend(
                cascade
                    .failed
                    .iter()
                    .map(|(p, e)| format!("{}: {e}", p.display())),
            );
            self.frames.evict_base(&base);
            self.smoothing.forget(&base);

            if active.as_deref().map(base_name) == Some(base.as_str()) {
                self.session.clear_active()?;
                report.active_cleared = true;
            }
        }
        info!(
            deleted = report.deleted.len(),
            artifacts = report.artifacts_removed,
            "datasets deleted"
        );
        Ok(report)
    }

    pub(crate) fn active_base(&mut self) -> Result<String> {
        Ok(self.session.active_base()?)
    }

    /// The frame downstream stages read, with its base and path.
    pub(crate) fn processing_frame(&mut self) -> Result<(String, PathBuf, Arc<Frame>)> {
        let base = self.active_base()?;
        let path = self.session.processing_path()?;
        let frame = self.load_frame(&base, &ArtifactKind::Processing, &path)?;
        Ok((base, path, frame))
    }

    pub(crate) fn load_frame(
        &mut self,
        base: &str,
        kind: &ArtifactKind,
        path: &Path,
    ) -> Result<Arc<Frame>> {
        self.frames
            .get_or_load(base, kind, path, |p| Frame::read_csv(p).map_err(PipelineError::from))
    }

    pub(crate) fn write_frame(
        &mut self,
        base: &str,
        kind: &ArtifactKind,
        frame: Frame,
    ) -> Result<PathBuf> {
        let path = self.store.save_derived(base, kind, frame.to_csv()?.as_bytes())?;
        self.frames.insert(base, kind, &path, frame);
        Ok(path)
    }

    /// Make `path` the processing artifact. Split and scaled outputs were
    /// built from the previous one and are removed.
    pub(crate) fn promote(&mut self, base: &str, path: &Path) -> Result<()> {
        self.session.set_processing(path)?;
        self.drop_stale(base, false);
        Ok(())
    }

    /// Remove split outputs (or only the scaled ones) built from an earlier
    /// input. Failures are logged and do not fail the stage.
    pub(crate) fn drop_stale(&mut self, base: &str, scaled_only: bool) {
        let stale = self.store.invalidate_downstream(base, scaled_only);
        if !stale.removed.is_empty() {
            info!(base, removed = stale.removed.len(), scaled_only, "stale split outputs removed");
        }
        if !stale.is_clean() {
            for (path, error) in &stale.failed {
                warn!(base, path = %path.display(), error = %error, "stale split output left on disk");
            }
        }
    }

    pub(crate) fn relative(&self, path: &Path) -> String {
        self.resolver()
            .relative(path)
            .unwrap_or_else(|| path.display().to_string())
    }
}

/// Only CSV is accepted; spreadsheets get a specific message.
pub(crate) fn check_csv_name(name: &str) -> Result<()> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(()),
        Some("xlsx") | Some("xls") => Err(PipelineError::UnsupportedFormat(
            "Excel workbooks are not accepted; export the sheet as CSV".to_string(),
        )),
        Some(other) => Err(PipelineError::UnsupportedFormat(format!(".{other}"))),
        None => Err(PipelineError::UnsupportedFormat(
            "file has no extension; expected .csv".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifacts::InMemorySessionStore;

    fn bench(root: &Path) -> Workbench<InMemorySessionStore> {
        Workbench::with_session(WorkbenchConfig::with_root(root), InMemorySessionStore::new()).unwrap()
    }

    #[test]
    fn test_upload_rejects_spreadsheets_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = bench(dir.path());
        assert!(matches!(
            wb.upload("book.xlsx", b"x\n1\n"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            wb.upload("empty.csv", b"x,y\n"),
            Err(PipelineError::InvalidParameter { .. })
        ));
        assert!(matches!(
            wb.upload("ragged.csv", b"x,y\n1\n"),
            Err(PipelineError::InvalidParameter { .. })
        ));
        assert!(wb.list_datasets().unwrap().datasets.is_empty());
    }

    #[test]
    fn test_dataset_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkbenchConfig::with_root(dir.path());
        config.max_datasets = 2;
        let mut wb = Workbench::with_session(config, InMemorySessionStore::new()).unwrap();
        wb.upload("a.csv", b"x\n1\n").unwrap();
        wb.upload("a.csv", b"x\n2\n").unwrap();
        let listing = wb.list_datasets().unwrap();
        assert!(!listing.can_upload);
        assert!(matches!(
            wb.upload("b.csv", b"x\n1\n"),
            Err(PipelineError::DatasetLimitExceeded { limit: 2 })
        ));
    }

    #[test]
    fn test_switch_requires_existing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = bench(dir.path());
        wb.upload("a.csv", b"x\n1\n").unwrap();
        wb.upload("b.csv", b"x\n1\n").unwrap();
        assert_eq!(wb.active_dataset().unwrap().as_deref(), Some("b.csv"));
        wb.switch_dataset("a.csv").unwrap();
        assert_eq!(wb.active_dataset().unwrap().as_deref(), Some("a.csv"));
        assert!(matches!(
            wb.switch_dataset("zzz.csv"),
            Err(PipelineError::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_upload_name_is_uniquified() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = bench(dir.path());
        let first = wb.upload("my sales.csv", b"x\n1\n").unwrap();
        let second = wb.upload("my sales.csv", b"x\n1\n").unwrap();
        assert_eq!(first.name, "my_sales.csv");
        assert_eq!(second.name, "my_sales(1).csv");
        assert_eq!(first.hash, second.hash);
    }
}
