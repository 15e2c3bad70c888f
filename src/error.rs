//! @ai:module:intent Define terminal error types for an analysis run
//! @ai:module:layer domain
//! @ai:module:public_api AnalysisError, SkipReason
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Conditions that end a run with a "no data" outcome instead of a crash
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("no rollout sources found under {}", root.display())]
    NoSources { root: PathBuf },

    #[error("{sources} source(s) loaded but no usable rollout records remained after normalization")]
    NoRecords { sources: usize },

    #[error("no task buckets are configured")]
    NoBuckets,

    #[error("task bucket '{0}' has no keywords or patterns")]
    EmptyBucket(String),

    #[error("comparison '{comparison}' references unknown bucket '{bucket}'")]
    UnknownBucket { comparison: String, bucket: String },

    #[error("comparison '{comparison}' lists bucket '{bucket}' more than once")]
    DuplicateBucket { comparison: String, bucket: String },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cost bin width must be positive, got {0}")]
    InvalidBinWidth(f64),
}

/// @ai:intent Why a single source file was left out of a load
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("zero-byte file")]
    Empty,

    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("malformed: {0}")]
    Malformed(String),

    #[error("no rows")]
    NoRows,

    #[error("unsupported format: .{0}")]
    Unsupported(String),
}
