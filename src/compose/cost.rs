//! @ai:module:intent Accuracy as a function of completion cost
//! @ai:module:layer application
//! @ai:module:public_api CostBin, ModelEfficiency, OutcomeLength, cost_bin, efficiency_curve, model_efficiency, outcome_lengths
//! @ai:module:stateless true

use super::rules::{selects, FamilyClassifier};
use crate::normalize::RolloutRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// @ai:intent Mean reward of one family within one cost interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBin {
    pub family: String,
    pub bin_start: f64,
    pub n_records: u32,
    pub mean_reward: f64,
}

/// @ai:intent Accuracy vs. spend for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEfficiency {
    pub model_id: String,
    pub family: String,
    pub n_records: u32,
    pub accuracy: f64,
    pub mean_cost: f64,
}

/// @ai:intent Spread of completion cost for correct or incorrect answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeLength {
    pub model_id: String,
    /// "correct" or "incorrect"
    pub outcome: String,
    pub n_records: u32,
    pub mean_cost: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

/// @ai:intent Lower edge of the bin holding `cost`
/// @ai:pre width > 0
/// @ai:effects pure
pub fn cost_bin(cost: f64, width: f64) -> f64 {
    (cost / width).floor() * width
}

/// Records on selected tasks that carry a cost at or under the ceiling.
fn costed<'a>(
    records: &'a [RolloutRecord],
    tasks: &'a [String],
    ceiling: f64,
) -> impl Iterator<Item = (&'a RolloutRecord, f64)> + 'a {
    records.iter().filter_map(move |r| {
        let cost = r.completion_cost?;
        (cost <= ceiling && selects(tasks, &r.task_id)).then_some((r, cost))
    })
}

/// @ai:intent Mean raw reward per (family, cost bin)
/// @ai:pre width > 0
/// @ai:effects pure
pub fn efficiency_curve(
    records: &[RolloutRecord],
    tasks: &[String],
    families: &FamilyClassifier,
    width: f64,
    ceiling: f64,
) -> Vec<CostBin> {
    // Keyed by bin index so bins sort numerically within a family.
    let mut bins: BTreeMap<(&str, i64), (f64, f64, u32)> = BTreeMap::new();

    for (record, cost) in costed(records, tasks, ceiling) {
        let bin_start = cost_bin(cost, width);
        let entry = bins
            .entry((
                families.classify(&record.model_id),
                (bin_start / width).round() as i64,
            ))
            .or_insert((bin_start, 0.0, 0));
        entry.1 += record.reward;
        entry.2 += 1;
    }

    bins.into_iter()
        .map(|((family, _), (bin_start, sum, count))| CostBin {
            family: family.to_string(),
            bin_start,
            n_records: count,
            mean_reward: sum / count as f64,
        })
        .collect()
}

/// @ai:intent Per-model accuracy and mean cost over costed records
/// @ai:effects pure
pub fn model_efficiency(
    records: &[RolloutRecord],
    tasks: &[String],
    families: &FamilyClassifier,
    ceiling: f64,
) -> Vec<ModelEfficiency> {
    let mut models: BTreeMap<&str, (f64, f64, u32)> = BTreeMap::new();

    for (record, cost) in costed(records, tasks, ceiling) {
        let entry = models.entry(record.model_id.as_str()).or_insert((0.0, 0.0, 0));
        entry.0 += record.reward;
        entry.1 += cost;
        entry.2 += 1;
    }

    models
        .into_iter()
        .map(|(model_id, (reward_sum, cost_sum, count))| ModelEfficiency {
            model_id: model_id.to_string(),
            family: families.classify(model_id).to_string(),
            n_records: count,
            accuracy: reward_sum / count as f64,
            mean_cost: cost_sum / count as f64,
        })
        .collect()
}

/// @ai:intent Cost quartiles by outcome for models in one family
/// @ai:effects pure
pub fn outcome_lengths(
    records: &[RolloutRecord],
    families: &FamilyClassifier,
    family: &str,
    correct_threshold: f64,
    ceiling: f64,
) -> Vec<OutcomeLength> {
    let mut groups: BTreeMap<(&str, bool), Vec<f64>> = BTreeMap::new();

    for (record, cost) in costed(records, &[], ceiling) {
        if families.classify(&record.model_id) != family {
            continue;
        }
        groups
            .entry((record.model_id.as_str(), record.reward > correct_threshold))
            .or_default()
            .push(cost);
    }

    groups
        .into_iter()
        .map(|((model_id, correct), mut costs)| {
            costs.sort_by(f64::total_cmp);
            OutcomeLength {
                model_id: model_id.to_string(),
                outcome: if correct { "correct" } else { "incorrect" }.to_string(),
                n_records: costs.len() as u32,
                mean_cost: costs.iter().sum::<f64>() / costs.len() as f64,
                q1: quantile(&costs, 0.25),
                median: quantile(&costs, 0.5),
                q3: quantile(&costs, 0.75),
            }
        })
        .collect()
}

/// @ai:intent Linearly interpolated quantile of sorted values
/// @ai:pre sorted is non-empty and ascending
/// @ai:effects pure
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}
