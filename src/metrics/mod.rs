//! @ai:module:intent Rollout aggregation and statistical estimation
//! @ai:module:layer application
//! @ai:module:public_api ExampleAggregate, ModelTaskScore, ModelPassSummary, TaskNoiseAudit, RolloutAggregator, StatisticalEstimator, pass_at_k

pub mod aggregator;
pub mod estimator;
pub mod types;

pub use aggregator::{sample_std, RolloutAggregator, RolloutAggregatorTrait};
pub use estimator::{pass_at_k, select_k, StatisticalEstimator, StatisticalEstimatorTrait};
pub use types::{AuditZone, ExampleAggregate, ModelPassSummary, ModelTaskScore, TaskNoiseAudit};
