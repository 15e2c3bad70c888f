//! @ai:module:intent Table row types produced by aggregation and estimation
//! @ai:module:layer domain
//! @ai:module:public_api ExampleAggregate, ModelTaskScore, ModelPassSummary, TaskNoiseAudit, AuditZone
//! @ai:module:stateless true

use crate::config::CompositeMetric;
use serde::{Deserialize, Serialize};

/// @ai:intent Repeated-sampling summary of one (model, task, example)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleAggregate {
    pub model_id: String,
    pub task_id: String,
    pub example_id: String,
    pub n_samples: u32,
    pub n_correct: u32,
    /// Sample standard deviation of raw rewards; `None` for a single draw
    pub reward_std: Option<f64>,
    pub reward_sum: f64,
    /// Sum and count of costs at or under the cost ceiling
    pub cost_sum: f64,
    pub cost_count: u32,
}

impl ExampleAggregate {
    /// @ai:intent Exact per-example pass@1
    /// @ai:effects pure
    pub fn pass_1(&self) -> f64 {
        if self.n_samples == 0 {
            return 0.0;
        }
        self.n_correct as f64 / self.n_samples as f64
    }

    /// @ai:intent Noise contribution, undefined deviation counts as zero
    /// @ai:effects pure
    pub fn noise(&self) -> f64 {
        self.reward_std.unwrap_or(0.0)
    }
}

/// @ai:intent Scores of one model on one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTaskScore {
    pub model_id: String,
    pub task_id: String,
    pub n_examples: u32,
    pub n_samples: u32,
    pub k: u32,
    pub pass_1: f64,
    pub pass_k: f64,
    pub noise_score: f64,
    pub mean_reward: f64,
    pub mean_cost: Option<f64>,
}

impl ModelTaskScore {
    /// Stable column names, in serialization order.
    pub const COLUMNS: &'static [&'static str] = &[
        "model_id",
        "task_id",
        "n_examples",
        "n_samples",
        "k",
        "pass_1",
        "pass_k",
        "noise_score",
        "mean_reward",
        "mean_cost",
    ];

    /// @ai:intent Read the column a composite averages
    /// @ai:effects pure
    pub fn metric(&self, metric: CompositeMetric) -> Option<f64> {
        match metric {
            CompositeMetric::Pass1 => Some(self.pass_1),
            CompositeMetric::PassK => Some(self.pass_k),
            CompositeMetric::MeanReward => Some(self.mean_reward),
            CompositeMetric::MeanCost => self.mean_cost,
        }
    }
}

/// @ai:intent Baseline vs. potential of one model over every example it saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPassSummary {
    pub model_id: String,
    pub n_examples: u32,
    pub pass_1: f64,
    pub pass_k: f64,
}

/// @ai:intent Where a task sits on the skill vs. luck map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditZone {
    /// High noise and accuracy below chance
    Lottery,
    /// Low noise and accuracy at or above chance
    GoldStandard,
    HighNoise,
    LowSkill,
}

impl AuditZone {
    /// @ai:intent Classify a task from its noise and accuracy
    /// @ai:effects pure
    pub fn classify(noise_score: f64, mean_accuracy: f64, noise_threshold: f64, chance: f64) -> Self {
        let noisy = noise_score >= noise_threshold;
        let skilled = mean_accuracy >= chance;
        match (noisy, skilled) {
            (true, false) => AuditZone::Lottery,
            (false, true) => AuditZone::GoldStandard,
            (true, true) => AuditZone::HighNoise,
            (false, false) => AuditZone::LowSkill,
        }
    }

    /// @ai:intent Convert zone to string representation
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditZone::Lottery => "lottery",
            AuditZone::GoldStandard => "gold_standard",
            AuditZone::HighNoise => "high_noise",
            AuditZone::LowSkill => "low_skill",
        }
    }
}

impl std::fmt::Display for AuditZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent Signal vs. noise of one task across all models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNoiseAudit {
    pub task_id: String,
    pub n_examples: u32,
    pub noise_score: f64,
    pub mean_accuracy: f64,
    pub zone: AuditZone,
}
