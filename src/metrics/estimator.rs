//! @ai:module:intent pass@1, unbiased pass@k and noise estimation from example aggregates
//! @ai:module:layer application
//! @ai:module:public_api pass_at_k, select_k, StatisticalEstimator, StatisticalEstimatorTrait
//! @ai:module:stateless true

use crate::config::{AuditConfig, PassKConfig};
use crate::metrics::types::{
    AuditZone, ExampleAggregate, ModelPassSummary, ModelTaskScore, TaskNoiseAudit,
};
use std::collections::BTreeMap;

/// @ai:intent Probability that at least one of k draws without replacement succeeds
/// @ai:pre n_correct <= n_samples
/// @ai:effects pure
pub fn pass_at_k(n_samples: u32, n_correct: u32, k: u32) -> f64 {
    if n_correct >= n_samples {
        return if n_samples == 0 { 0.0 } else { 1.0 };
    }
    if n_correct == 0 {
        return 0.0;
    }

    let k_eff = k.max(1).min(n_samples);
    let n = n_samples as f64;
    let failures = (n_samples - n_correct) as f64;

    // prod (n - c - i) / (n - i); a zero term means every draw set contains a success
    let mut prob_fail = 1.0;
    for i in 0..k_eff {
        let numerator = failures - i as f64;
        if numerator <= 0.0 {
            return 1.0;
        }
        prob_fail *= numerator / (n - i as f64);
    }

    1.0 - prob_fail
}

/// @ai:intent Pick the pass@k budget for a population of examples
/// @ai:effects pure
pub fn select_k(aggregates: &[ExampleAggregate], policy: &PassKConfig) -> Option<u32> {
    if let Some(k) = policy.k {
        return Some(k.max(1));
    }

    let observed = aggregates.iter().map(|a| a.n_samples).max()?;
    let capped = match policy.cap {
        Some(cap) => observed.min(cap),
        None => observed,
    };
    Some(capped.max(1))
}

/// @ai:intent Trait for turning example aggregates into score tables
pub trait StatisticalEstimatorTrait {
    /// @ai:intent Score each (model, task)
    fn score_tasks(&self, aggregates: &[ExampleAggregate]) -> Vec<ModelTaskScore>;

    /// @ai:intent Summarize each model over every example it saw
    fn summarize_models(&self, aggregates: &[ExampleAggregate]) -> Vec<ModelPassSummary>;
}

/// @ai:intent Estimator bound to one pass@k budget
pub struct StatisticalEstimator {
    k: u32,
}

impl StatisticalEstimator {
    /// @ai:intent Create an estimator for budget `k`
    /// @ai:effects pure
    pub fn new(k: u32) -> Self {
        Self { k: k.max(1) }
    }

    /// @ai:intent Budget used for pass@k
    /// @ai:effects pure
    pub fn k(&self) -> u32 {
        self.k
    }

    /// @ai:intent Per-example pass@k at this estimator's budget
    /// @ai:effects pure
    pub fn example_pass_k(&self, aggregate: &ExampleAggregate) -> f64 {
        pass_at_k(aggregate.n_samples, aggregate.n_correct, self.k)
    }

    /// @ai:intent Rank tasks by how much of their variation is sampling luck
    /// @ai:effects pure
    pub fn audit_tasks(
        &self,
        aggregates: &[ExampleAggregate],
        audit: &AuditConfig,
    ) -> Vec<TaskNoiseAudit> {
        let mut by_task: BTreeMap<&str, Vec<&ExampleAggregate>> = BTreeMap::new();
        for agg in aggregates {
            by_task.entry(agg.task_id.as_str()).or_default().push(agg);
        }

        by_task
            .into_iter()
            .map(|(task_id, group)| {
                let noise_score = average(group.iter().map(|a| a.noise()));
                let total_samples: u32 = group.iter().map(|a| a.n_samples).sum();
                let total_reward: f64 = group.iter().map(|a| a.reward_sum).sum();
                let mean_accuracy = if total_samples == 0 {
                    0.0
                } else {
                    total_reward / total_samples as f64
                };

                TaskNoiseAudit {
                    task_id: task_id.to_string(),
                    n_examples: group.len() as u32,
                    noise_score,
                    mean_accuracy,
                    zone: AuditZone::classify(
                        noise_score,
                        mean_accuracy,
                        audit.noise_threshold,
                        audit.chance_level,
                    ),
                }
            })
            .collect()
    }
}

impl StatisticalEstimatorTrait for StatisticalEstimator {
    /// @ai:intent Unweighted per-example means for each (model, task)
    /// @ai:effects pure
    fn score_tasks(&self, aggregates: &[ExampleAggregate]) -> Vec<ModelTaskScore> {
        let mut groups: BTreeMap<(&str, &str), Vec<&ExampleAggregate>> = BTreeMap::new();
        for agg in aggregates {
            groups
                .entry((agg.model_id.as_str(), agg.task_id.as_str()))
                .or_default()
                .push(agg);
        }

        groups
            .into_iter()
            .map(|((model_id, task_id), group)| {
                let n_samples: u32 = group.iter().map(|a| a.n_samples).sum();
                let reward_sum: f64 = group.iter().map(|a| a.reward_sum).sum();
                let cost_count: u32 = group.iter().map(|a| a.cost_count).sum();
                let cost_sum: f64 = group.iter().map(|a| a.cost_sum).sum();

                ModelTaskScore {
                    model_id: model_id.to_string(),
                    task_id: task_id.to_string(),
                    n_examples: group.len() as u32,
                    n_samples,
                    k: self.k,
                    pass_1: average(group.iter().map(|a| a.pass_1())),
                    pass_k: average(group.iter().map(|a| self.example_pass_k(a))),
                    noise_score: average(group.iter().map(|a| a.noise())),
                    mean_reward: if n_samples == 0 {
                        0.0
                    } else {
                        reward_sum / n_samples as f64
                    },
                    mean_cost: (cost_count > 0).then(|| cost_sum / cost_count as f64),
                }
            })
            .collect()
    }

    /// @ai:intent Per-model means over all examples of all tasks
    /// @ai:effects pure
    fn summarize_models(&self, aggregates: &[ExampleAggregate]) -> Vec<ModelPassSummary> {
        let mut groups: BTreeMap<&str, Vec<&ExampleAggregate>> = BTreeMap::new();
        for agg in aggregates {
            groups.entry(agg.model_id.as_str()).or_default().push(agg);
        }

        let mut summaries: Vec<ModelPassSummary> = groups
            .into_iter()
            .map(|(model_id, group)| ModelPassSummary {
                model_id: model_id.to_string(),
                n_examples: group.len() as u32,
                pass_1: average(group.iter().map(|a| a.pass_1())),
                pass_k: average(group.iter().map(|a| self.example_pass_k(a))),
            })
            .collect();

        summaries.sort_by(|a, b| b.pass_1.total_cmp(&a.pass_1));
        summaries
    }
}

/// @ai:intent Calculate average of an iterator of f64
/// @ai:effects pure
pub(crate) fn average<I: Iterator<Item = f64>>(iter: I) -> f64 {
    let (sum, count) = iter.fold((0.0, 0u32), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn aggregate(model: &str, task: &str, example: &str, n: u32, c: u32) -> ExampleAggregate {
        ExampleAggregate {
            model_id: model.to_string(),
            task_id: task.to_string(),
            example_id: example.to_string(),
            n_samples: n,
            n_correct: c,
            reward_std: None,
            reward_sum: c as f64,
            cost_sum: 0.0,
            cost_count: 0,
        }
    }

    #[test]
    fn test_average() {
        let values = vec![10.0, 20.0, 30.0];
        assert!((average(values.into_iter()) - 20.0).abs() < 0.01);
        assert_eq!(average(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_boundary_laws_for_every_k() {
        for n in 1..=10 {
            for k in 1..=12 {
                assert_eq!(pass_at_k(n, n, k), 1.0, "n={n} k={k}");
                assert_eq!(pass_at_k(n, 0, k), 0.0, "n={n} k={k}");
            }
        }
    }

    #[test]
    fn test_k_one_reduces_to_pass_1() {
        for n in 1..=10 {
            for c in 0..=n {
                let expected = c as f64 / n as f64;
                assert!((pass_at_k(n, c, 1) - expected).abs() < EPS, "n={n} c={c}");
            }
        }
    }

    #[test]
    fn test_monotone_in_k() {
        for n in 1..=10 {
            for c in 0..=n {
                let mut previous = 0.0;
                for k in 1..=12 {
                    let value = pass_at_k(n, c, k);
                    assert!(value + EPS >= previous, "n={n} c={c} k={k}");
                    assert!((0.0..=1.0).contains(&value));
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn test_zero_term_short_circuits() {
        // (2/4) * (1/3) * (0/2) -> certain success
        assert_eq!(pass_at_k(4, 2, 4), 1.0);
        // k' = n_samples with at least one success
        assert_eq!(pass_at_k(8, 1, 8), 1.0);
        // k larger than the sample count degrades to k' = n
        assert_eq!(pass_at_k(4, 1, 8), 1.0);
    }

    #[test]
    fn test_interior_value() {
        // 1 - (3/5)(2/4)
        assert!((pass_at_k(5, 2, 2) - 0.7).abs() < EPS);
        // 1 - (7/8)(6/7)(5/6)
        assert!((pass_at_k(8, 1, 3) - 0.375).abs() < EPS);
    }

    #[test]
    fn test_select_k_policy() {
        let aggregates = vec![
            aggregate("m", "t", "1", 3, 1),
            aggregate("m", "t", "2", 16, 4),
        ];

        assert_eq!(select_k(&aggregates, &PassKConfig::default()), Some(8));
        assert_eq!(
            select_k(&aggregates, &PassKConfig { cap: None, k: None }),
            Some(16)
        );
        assert_eq!(
            select_k(&aggregates, &PassKConfig { cap: Some(8), k: Some(2) }),
            Some(2)
        );
        assert_eq!(select_k(&[], &PassKConfig::default()), None);
    }

    #[test]
    fn test_score_tasks_weights_examples_equally() {
        let aggregates = vec![
            aggregate("m", "t", "1", 1, 1),
            aggregate("m", "t", "2", 9, 0),
        ];

        let scores = StatisticalEstimator::new(4).score_tasks(&aggregates);
        assert_eq!(scores.len(), 1);
        let score = &scores[0];
        assert!((score.pass_1 - 0.5).abs() < EPS);
        assert!((score.pass_k - 0.5).abs() < EPS);
        assert!((score.mean_reward - 0.1).abs() < EPS);
        assert_eq!(score.n_samples, 10);
        assert_eq!(score.k, 4);
        assert_eq!(score.mean_cost, None);
    }

    #[test]
    fn test_single_sample_contributes_zero_noise() {
        let mut noisy = aggregate("m", "t", "1", 2, 1);
        noisy.reward_std = Some(0.6);
        let single = aggregate("m", "t", "2", 1, 1);

        let scores = StatisticalEstimator::new(2).score_tasks(&[noisy, single]);
        assert!((scores[0].noise_score - 0.3).abs() < EPS);
        assert!(scores[0].noise_score >= 0.0);
    }

    #[test]
    fn test_mean_cost_over_costed_records() {
        let mut a = aggregate("m", "t", "1", 2, 1);
        a.cost_sum = 300.0;
        a.cost_count = 2;
        let mut b = aggregate("m", "t", "2", 2, 1);
        b.cost_sum = 600.0;
        b.cost_count = 1;

        let scores = StatisticalEstimator::new(2).score_tasks(&[a, b]);
        assert_eq!(scores[0].mean_cost, Some(300.0));
    }

    #[test]
    fn test_summarize_models_sorted_by_pass_1() {
        let aggregates = vec![
            aggregate("weak", "t", "1", 4, 1),
            aggregate("strong", "t", "1", 4, 3),
            aggregate("strong", "u", "1", 4, 4),
        ];

        let summaries = StatisticalEstimator::new(4).summarize_models(&aggregates);
        assert_eq!(summaries[0].model_id, "strong");
        assert_eq!(summaries[0].n_examples, 2);
        assert!((summaries[0].pass_1 - 0.875).abs() < EPS);
        assert_eq!(summaries[1].pass_k, 1.0);
    }

    #[test]
    fn test_audit_tasks() {
        let mut lucky = aggregate("m", "lottery", "1", 2, 1);
        lucky.reward_std = Some(0.7);
        let mut lucky2 = aggregate("m", "lottery", "2", 2, 0);
        lucky2.reward_std = Some(0.0);
        let solid = aggregate("m", "solid", "1", 4, 4);

        let audit = StatisticalEstimator::new(2).audit_tasks(
            &[lucky, lucky2, solid],
            &AuditConfig::default(),
        );
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].task_id, "lottery");
        assert!((audit[0].noise_score - 0.35).abs() < EPS);
        assert!((audit[0].mean_accuracy - 0.25).abs() < EPS);
        assert_eq!(audit[0].zone, AuditZone::Lottery);
        assert_eq!(audit[1].zone, AuditZone::GoldStandard);
    }
}
