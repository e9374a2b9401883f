use crate::{Result, Summary, Workbench};
use artifacts::{ArtifactKind, SessionStore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;
use tabular::{filter_by_target, format_number, summarize, EdaSummary};
use tracing::{debug, info};

/// On-disk EDA cache. Valid only for the exact source file it was built
/// from.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSummary {
    source: String,
    source_len: u64,
    source_modified: SystemTime,
    summary: EdaSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExploreResult {
    pub source: String,
    pub cached: bool,
    pub summary: EdaSummary,
}

impl Summary for ExploreResult {
    fn summary(&self) -> String {
        format!(
            "{} rows x {} columns in {}",
            self.summary.overview.rows, self.summary.overview.columns, self.source
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterParams {
    pub target: String,
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub promote: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub output: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub promoted: bool,
}

impl Summary for FilterResult {
    fn summary(&self) -> String {
        format!(
            "Kept {} of {} rows ({})",
            self.rows_after, self.rows_before, self.output
        )
    }
}

fn stamp(path: &Path) -> Option<(u64, SystemTime)> {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()?))
}

fn percent_label(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("{}", p as i64)
    } else {
        format_number(p)
    }
}

impl<S: SessionStore> Workbench<S> {
    /// Overview, describe and missing-value report of the processing
    /// artifact, served from `eda/<base>_summary.json` while it is current.
    pub fn explore(&mut self, refresh: bool) -> Result<ExploreResult> {
        let base = self.active_base()?;
        let source_path = self.session.processing_path()?;
        let source = self.relative(&source_path);
        let cache_path = self.resolver().resolve(&base, &ArtifactKind::EdaSummary)?;

        if !refresh {
            if let Some(hit) = self.read_eda_cache(&cache_path, &source, &source_path) {
                debug!(base = %base, "eda summary served from cache");
                return Ok(ExploreResult {
                    source,
                    cached: true,
                    summary: hit,
                });
            }
        }

        let frame = self.load_frame(&base, &ArtifactKind::Processing, &source_path)?;
        let summary = summarize(&frame);
        if let Some((source_len, source_modified)) = stamp(&source_path) {
            let cached = CachedSummary {
                source: source.clone(),
                source_len,
                source_modified,
                summary: summary.clone(),
            };
            self.store.save_derived(
                &base,
                &ArtifactKind::EdaSummary,
                &serde_json::to_vec_pretty(&cached)?,
            )?;
        }
        info!(base = %base, source = %source, "eda summary computed");
        Ok(ExploreResult {
            source,
            cached: false,
            summary,
        })
    }

    fn read_eda_cache(&self, cache: &Path, source: &str, source_path: &Path) -> Option<EdaSummary> {
        let bytes = std::fs::read(cache).ok()?;
        let cached: CachedSummary = serde_json::from_slice(&bytes).ok()?;
        let (len, modified) = stamp(source_path)?;
        (cached.source == source && cached.source_len == len && cached.source_modified == modified)
            .then_some(cached.summary)
    }

    /// Keep rows whose target lies within the given percentiles, written to
    /// `processed/<base>_filtered_<target>_<lo>_<hi>.csv`.
    pub fn filter_target(&mut self, params: &FilterParams) -> Result<FilterResult> {
        let (base, _, frame) = self.processing_frame()?;
        let filtered = filter_by_target(&frame, &params.target, params.lower, params.upper)?;
        let rows_before = frame.n_rows();
        let rows_after = filtered.n_rows();

        let kind = ArtifactKind::Filtered {
            target: params.target.clone(),
            lower: percent_label(params.lower),
            upper: percent_label(params.upper),
        };
        let path = self.write_frame(&base, &kind, filtered)?;
        if params.promote {
            self.promote(&base, &path)?;
        }
        info!(base = %base, rows_before, rows_after, "target filter applied");
        Ok(FilterResult {
            output: self.relative(&path),
            rows_before,
            rows_after,
            promoted: params.promote,
        })
    }
}
