//! @ai:module:intent Positional answer bias of the strongest models on one task
//! @ai:module:layer application
//! @ai:module:public_api AnswerDistribution, answer_distribution
//! @ai:module:stateless true

use crate::config::BiasConfig;
use crate::normalize::RolloutRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// @ai:intent How often a model picked each answer label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDistribution {
    pub model_id: String,
    pub mean_reward: f64,
    /// Answers carrying a valid label
    pub total: u32,
    pub counts: BTreeMap<String, u32>,
}

impl AnswerDistribution {
    /// @ai:intent Share of answers with a given label
    /// @ai:effects pure
    pub fn share(&self, label: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.counts.get(label).copied().unwrap_or(0) as f64 / self.total as f64
    }
}

/// @ai:intent Label counts for the top models by mean reward on the bias task
/// @ai:effects pure
pub fn answer_distribution(records: &[RolloutRecord], config: &BiasConfig) -> Vec<AnswerDistribution> {
    let Some(task) = config.task.as_deref() else {
        return Vec::new();
    };

    let mut models: BTreeMap<&str, Vec<&RolloutRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.task_id.eq_ignore_ascii_case(task)) {
        models.entry(record.model_id.as_str()).or_default().push(record);
    }

    let mut ranked: Vec<(&str, f64, Vec<&RolloutRecord>)> = models
        .into_iter()
        .map(|(model_id, group)| {
            let mean = group.iter().map(|r| r.reward).sum::<f64>() / group.len() as f64;
            (model_id, mean, group)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(config.top_models);

    ranked
        .into_iter()
        .map(|(model_id, mean_reward, group)| {
            let mut counts: BTreeMap<String, u32> =
                config.labels.iter().map(|l| (l.to_uppercase(), 0)).collect();
            for label in group.iter().filter_map(|r| r.answer_label.as_deref()) {
                if let Some(count) = counts.get_mut(label) {
                    *count += 1;
                }
            }

            AnswerDistribution {
                model_id: model_id.to_string(),
                mean_reward,
                total: counts.values().sum(),
                counts,
            }
        })
        .collect()
}
