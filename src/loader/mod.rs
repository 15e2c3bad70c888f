//! @ai:module:intent Discover and read per-model, per-task rollout files
//! @ai:module:layer infrastructure
//! @ai:module:public_api RecordLoader, RecordLoaderTrait, LoadOutcome, RawBatch, SourceTag, SkippedSource
//! @ai:module:stateless true

pub mod reader;

pub use reader::{read_source, unsupported_extension, RawRow, SourceFormat};

use crate::config::FilterConfig;
use crate::error::{AnalysisError, SkipReason};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Model id used when a file sits in a directory without a usable name.
pub const UNKNOWN_MODEL: &str = "unknown";

/// @ai:intent Provenance of a batch derived from its location in the tree
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceTag {
    /// Innermost directory name
    pub model_id: String,
    /// File name without its extension
    pub task_id: String,
}

impl SourceTag {
    /// @ai:intent Derive the tag from `<..>/<model>/<task>.<ext>`
    /// @ai:effects pure
    pub fn from_path(path: &Path) -> Option<Self> {
        let task_id = path.file_stem()?.to_str()?.to_string();
        let model_id = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(UNKNOWN_MODEL)
            .to_string();

        Some(Self { model_id, task_id })
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.model_id, self.task_id)
    }
}

/// @ai:intent Raw rows read from one source unit
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub tag: SourceTag,
    pub paths: Vec<PathBuf>,
    pub rows: Vec<RawRow>,
}

/// @ai:intent A source that was left out, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// @ai:intent Everything a load produced: parsed batches plus skip records
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub batches: BTreeMap<SourceTag, RawBatch>,
    pub skipped: Vec<SkippedSource>,
    pub sources_seen: usize,
}

impl LoadOutcome {
    /// @ai:intent Total raw rows across all batches
    /// @ai:effects pure
    pub fn row_count(&self) -> usize {
        self.batches.values().map(|b| b.rows.len()).sum()
    }
}

/// @ai:intent Trait for loading rollout batches
pub trait RecordLoaderTrait {
    /// @ai:intent Load every matching source under a root directory
    fn load_all(&self, root: &Path) -> LoadOutcome;
}

/// @ai:intent Reads rollout files selected by name filters
pub struct RecordLoader {
    filter: FilterConfig,
    pattern: Option<Regex>,
}

impl RecordLoader {
    /// @ai:intent Create a loader that accepts every source
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            filter: FilterConfig::default(),
            pattern: None,
        }
    }

    /// @ai:intent Create a loader restricted by substring and pattern filters
    /// @ai:effects pure
    pub fn with_filter(filter: &FilterConfig) -> Result<Self, AnalysisError> {
        let pattern = filter
            .pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|source| AnalysisError::InvalidPattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            filter: filter.clone(),
            pattern,
        })
    }

    fn accepts(&self, tag: &SourceTag) -> bool {
        let pattern_match = self
            .pattern
            .as_ref()
            .map(|re| re.is_match(&tag.task_id))
            .unwrap_or(true);

        pattern_match && self.filter.matches(&tag.model_id, &tag.task_id)
    }

    /// @ai:intent Lazily yield one batch or skip record per matching source
    /// @ai:effects fs:read
    pub fn sources<'a>(
        &'a self,
        root: &Path,
    ) -> impl Iterator<Item = Result<RawBatch, SkippedSource>> + 'a {
        let root = root.to_path_buf();

        WalkDir::new(root.clone())
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(SkippedSource {
                            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                            reason: SkipReason::Unreadable(e.to_string()),
                        }))
                    }
                };

                if !entry.file_type().is_file() {
                    return None;
                }
                let path = entry.path();
                let skip = |reason: SkipReason| -> Option<Result<RawBatch, SkippedSource>> {
                    Some(Err(SkippedSource {
                        path: path.to_path_buf(),
                        reason,
                    }))
                };

                let format = match SourceFormat::from_path(path) {
                    Some(format) => Ok(format),
                    None => Err(unsupported_extension(path)?),
                };
                let Some(tag) = SourceTag::from_path(path) else {
                    return skip(SkipReason::Unreadable("file name is not valid UTF-8".to_string()));
                };
                if !self.accepts(&tag) {
                    return None;
                }
                let format = match format {
                    Ok(format) => format,
                    Err(ext) => return skip(SkipReason::Unsupported(ext)),
                };

                match read_source(path, format) {
                    Ok(rows) => Some(Ok(RawBatch {
                        tag,
                        paths: vec![path.to_path_buf()],
                        rows,
                    })),
                    Err(reason) => skip(reason),
                }
            })
    }
}

impl Default for RecordLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordLoaderTrait for RecordLoader {
    /// @ai:intent Collect all sources, merging batches that share a tag
    /// @ai:effects fs:read
    fn load_all(&self, root: &Path) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        for source in self.sources(root) {
            outcome.sources_seen += 1;
            match source {
                Ok(batch) => {
                    tracing::debug!("Loaded {} rows from {}", batch.rows.len(), batch.tag);
                    match outcome.batches.get_mut(&batch.tag) {
                        Some(existing) => {
                            existing.paths.extend(batch.paths);
                            existing.rows.extend(batch.rows);
                        }
                        None => {
                            outcome.batches.insert(batch.tag.clone(), batch);
                        }
                    }
                }
                Err(skipped) => {
                    tracing::warn!(
                        "Skipping source {}: {}",
                        skipped.path.display(),
                        skipped.reason
                    );
                    outcome.skipped.push(skipped);
                }
            }
        }

        if !outcome.skipped.is_empty() {
            tracing::warn!(
                "Skipped {} of {} sources under {}",
                outcome.skipped.len(),
                outcome.sources_seen,
                root.display()
            );
        }

        outcome
    }
}
