use crate::{base_name, belongs_to, ArtifactDir, ArtifactKind, ArtifactStore, FeatureSelection};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a cascade actually did. Failures are per file and never stop the
/// rest of the cascade.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InvalidationReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ArtifactStore {
    /// Remove every derived artifact owned by `base`.
    ///
    /// Indexed paths go first. The directory sweep then catches files
    /// written before the index existed: a stem qualifies when it is `base`
    /// or `base_...`, unless another indexed base owns it or a longer raw
    /// dataset name (say `A_v2` when invalidating `A`) matches it too.
    pub fn invalidate(&mut self, base: &str) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        for rel in self.index_mut().remove_base(base) {
            let path = self.resolver().absolute(&rel);
            remove_into(&path, &mut report);
        }

        let longer = self.longer_bases(base);
        for dir in ArtifactDir::DERIVED {
            let dir_path = self.resolver().dir(dir);
            let entries = match std::fs::read_dir(&dir_path) {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(dir = %dir_path.display(), error = %e, "cannot scan artifact directory");
                    report.failed.push((dir_path, e.to_string()));
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if !belongs_to(base, stem) || longer.iter().any(|b| belongs_to(b, stem)) {
                    continue;
                }
                let owned_elsewhere = self
                    .resolver()
                    .relative(&path)
                    .and_then(|rel| self.index().owner_of(&rel).map(|o| o != base))
                    .unwrap_or(false);
                if owned_elsewhere {
                    continue;
                }
                remove_into(&path, &mut report);
            }
        }

        if let Err(e) = self.persist_index() {
            warn!(error = %e, "dependency index not saved after invalidation");
            report
                .failed
                .push((self.resolver().index_file(), e.to_string()));
        }

        let selection_path = self.resolver().selection_file();
        match FeatureSelection::clear_if_owned(&selection_path, base) {
            Ok(true) => debug!(base, "feature selection cleared"),
            Ok(false) => {}
            Err(e) => {
                warn!(base, error = %e, "feature selection not cleared");
                report.failed.push((selection_path, e.to_string()));
            }
        }

        info!(
            base,
            removed = report.removed.len(),
            failed = report.failed.len(),
            "dataset artifacts invalidated"
        );
        report
    }

    /// Split and scaled outputs of `base` become stale whenever the
    /// processing artifact changes. With `scaled_only`, the split files
    /// survive (re-splitting only stales the scaled ones).
    pub fn invalidate_downstream(&mut self, base: &str, scaled_only: bool) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        let kinds: Vec<ArtifactKind> = if scaled_only {
            scaled_kinds()
        } else {
            crate::SplitPart::ALL
                .into_iter()
                .map(ArtifactKind::Split)
                .chain(scaled_kinds())
                .collect()
        };
        for kind in kinds {
            let path = match self.resolver().resolve(base, &kind) {
                Ok(p) => p,
                Err(e) => {
                    report.failed.push((PathBuf::from(base), e.to_string()));
                    continue;
                }
            };
            match self.remove(&path) {
                Ok(true) => report.removed.push(path),
                Ok(false) => {}
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "stale artifact not removed");
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        if !report.removed.is_empty() {
            debug!(base, removed = report.removed.len(), "downstream artifacts invalidated");
        }
        report
    }

    /// Other raw datasets whose base starts with `base_`; their files must
    /// survive a sweep for `base`.
    fn longer_bases(&self, base: &str) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .list_raw()
            .unwrap_or_default()
            .iter()
            .map(|name| base_name(name).to_string())
            .collect();
        out.extend(self.index().bases().map(str::to_string));
        out.retain(|b| b != base && belongs_to(base, b));
        out
    }
}

fn scaled_kinds() -> Vec<ArtifactKind> {
    let mut kinds: Vec<ArtifactKind> = crate::ScaledPart::ALL
        .into_iter()
        .map(ArtifactKind::Scaled)
        .collect();
    kinds.push(ArtifactKind::ScalerParams);
    kinds
}

fn remove_into(path: &Path, report: &mut InvalidationReport) {
    match std::fs::remove_file(path) {
        Ok(()) => report.removed.push(path.to_path_buf()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %path.display(), error = %e, "artifact not removed, continuing cascade");
            report.failed.push((path.to_path_buf(), e.to_string()));
        }
    }
}
