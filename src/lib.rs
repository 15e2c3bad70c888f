//! @ai:module:intent Rollout evaluation statistics library
//! @ai:module:layer application
//! @ai:module:public_api config, error, loader, normalize, metrics, compose, pipeline, report

pub mod compose;
pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod report;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, SkipReason};
pub use loader::{LoadOutcome, RecordLoader, RecordLoaderTrait};
pub use metrics::{pass_at_k, ModelTaskScore, RolloutAggregator, StatisticalEstimator};
pub use normalize::{RolloutRecord, SchemaNormalizer};
pub use pipeline::{run_analysis, AnalysisResults};
pub use report::ReportGenerator;
