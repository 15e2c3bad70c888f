//! @ai:module:intent Group canonical records into per-example aggregates
//! @ai:module:layer application
//! @ai:module:public_api RolloutAggregator, RolloutAggregatorTrait, sample_std
//! @ai:module:stateless true

use crate::config::{CostConfig, ScoringConfig};
use crate::metrics::types::ExampleAggregate;
use crate::normalize::RolloutRecord;
use std::collections::BTreeMap;

/// @ai:intent Trait for rollout aggregation
pub trait RolloutAggregatorTrait {
    /// @ai:intent Aggregate records by (model, task, example)
    fn aggregate(&self, records: &[RolloutRecord]) -> Vec<ExampleAggregate>;
}

/// @ai:intent Counts samples and correct samples per example
pub struct RolloutAggregator {
    correct_threshold: f64,
    /// Costs above this stay out of the cost sums; the sample still counts
    cost_ceiling: Option<f64>,
}

impl RolloutAggregator {
    /// @ai:intent Create an aggregator treating `reward > 0` as correct
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            correct_threshold: 0.0,
            cost_ceiling: None,
        }
    }

    /// @ai:intent Create an aggregator with the configured threshold and cost ceiling
    /// @ai:effects pure
    pub fn from_config(scoring: &ScoringConfig, cost: &CostConfig) -> Self {
        Self {
            correct_threshold: scoring.correct_threshold,
            cost_ceiling: Some(cost.ceiling),
        }
    }

    /// @ai:intent Build the aggregate of one group of samples
    /// @ai:pre samples is non-empty and shares one key
    /// @ai:effects pure
    fn build(&self, samples: &[&RolloutRecord]) -> ExampleAggregate {
        let first = samples[0];
        let rewards: Vec<f64> = samples.iter().map(|r| r.reward).collect();
        let costs: Vec<f64> = samples
            .iter()
            .filter_map(|r| r.completion_cost)
            .filter(|c| self.cost_ceiling.map_or(true, |ceiling| *c <= ceiling))
            .collect();

        ExampleAggregate {
            model_id: first.model_id.clone(),
            task_id: first.task_id.clone(),
            example_id: first.example_id.clone(),
            n_samples: samples.len() as u32,
            n_correct: rewards.iter().filter(|r| **r > self.correct_threshold).count() as u32,
            reward_std: sample_std(&rewards),
            reward_sum: rewards.iter().sum(),
            cost_sum: costs.iter().sum(),
            cost_count: costs.len() as u32,
        }
    }
}

impl Default for RolloutAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl RolloutAggregatorTrait for RolloutAggregator {
    /// @ai:intent Aggregate records, ordered by model, task, then example
    /// @ai:effects pure
    fn aggregate(&self, records: &[RolloutRecord]) -> Vec<ExampleAggregate> {
        let mut groups: BTreeMap<(&str, &str, &str), Vec<&RolloutRecord>> = BTreeMap::new();

        for record in records {
            groups
                .entry((
                    record.model_id.as_str(),
                    record.task_id.as_str(),
                    record.example_id.as_str(),
                ))
                .or_default()
                .push(record);
        }

        let aggregates: Vec<ExampleAggregate> =
            groups.values().map(|samples| self.build(samples)).collect();

        tracing::info!(
            "Aggregated {} records into {} examples",
            records.len(),
            aggregates.len()
        );
        aggregates
    }
}

/// @ai:intent Sample standard deviation (n - 1 denominator)
/// @ai:effects pure
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (n - 1.0)).sqrt())
}
