//! @ai:module:intent Bucket composites over model-task scores with a strict join
//! @ai:module:layer application
//! @ai:module:public_api CompositeTable, ModelCompositeScore, DistractorRow, compose, distractor_sensitivity
//! @ai:module:stateless true

use super::rules::{FamilyClassifier, KeywordRule, RuleSet, TaskBuckets};
use crate::config::{CompositeMetric, DistractorConfig};
use crate::metrics::ModelTaskScore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// @ai:intent One model's value in every compared bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCompositeScore {
    pub model_id: String,
    pub family: String,
    pub scores: BTreeMap<String, f64>,
    /// Tasks that fed each bucket's mean
    pub task_counts: BTreeMap<String, u32>,
}

/// @ai:intent A composite comparison across buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeTable {
    pub name: String,
    pub metric: CompositeMetric,
    pub buckets: Vec<String>,
    pub rows: Vec<ModelCompositeScore>,
    /// Models present in some bucket but missing from another
    pub excluded_models: Vec<String>,
}

/// @ai:intent Accuracy lost when a harder variant of a task is substituted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistractorRow {
    pub model_id: String,
    pub family: String,
    pub easier: f64,
    pub harder: f64,
    pub drop: f64,
}

/// @ai:intent Average one metric per (model, bucket), then keep models present in every bucket
/// @ai:effects pure
pub fn compose(
    name: &str,
    scores: &[ModelTaskScore],
    buckets: &TaskBuckets,
    labels: &[String],
    metric: CompositeMetric,
    families: &FamilyClassifier,
) -> CompositeTable {
    let wanted: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
    let mut sums: BTreeMap<&str, BTreeMap<&str, (f64, u32)>> = BTreeMap::new();

    for score in scores {
        let Some(value) = score.metric(metric) else {
            continue;
        };
        for label in &wanted {
            if buckets.contains(label, &score.task_id) {
                let entry = sums
                    .entry(score.model_id.as_str())
                    .or_default()
                    .entry(*label)
                    .or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }

    let mut rows = Vec::new();
    let mut excluded_models = Vec::new();

    for (model_id, per_bucket) in sums {
        if per_bucket.len() < wanted.len() {
            excluded_models.push(model_id.to_string());
            continue;
        }

        rows.push(ModelCompositeScore {
            model_id: model_id.to_string(),
            family: families.classify(model_id).to_string(),
            scores: per_bucket
                .iter()
                .map(|(label, (sum, count))| (label.to_string(), sum / *count as f64))
                .collect(),
            task_counts: per_bucket
                .iter()
                .map(|(label, (_, count))| (label.to_string(), *count))
                .collect(),
        });
    }

    if !excluded_models.is_empty() {
        tracing::warn!(
            "Composite '{}' excluded {} model(s) missing a bucket: {}",
            name,
            excluded_models.len(),
            excluded_models.join(", ")
        );
    }

    CompositeTable {
        name: name.to_string(),
        metric,
        buckets: labels.to_vec(),
        rows,
        excluded_models,
    }
}

/// @ai:intent Compare pass@1 on two variants of a task, largest drop first
/// @ai:effects pure
pub fn distractor_sensitivity(
    scores: &[ModelTaskScore],
    config: &DistractorConfig,
    families: &FamilyClassifier,
) -> Vec<DistractorRow> {
    const EASIER: &str = "easier";
    const HARDER: &str = "harder";

    let buckets = TaskBuckets::new(RuleSet::new(vec![
        KeywordRule::new(EASIER, &[config.easier.as_str()]),
        KeywordRule::new(HARDER, &[config.harder.as_str()]),
    ]));
    let labels = [EASIER.to_string(), HARDER.to_string()];

    let table = compose(
        "distractor_sensitivity",
        scores,
        &buckets,
        &labels,
        CompositeMetric::Pass1,
        families,
    );

    let mut rows: Vec<DistractorRow> = table
        .rows
        .into_iter()
        .filter_map(|row| {
            let easier = *row.scores.get(EASIER)?;
            let harder = *row.scores.get(HARDER)?;
            Some(DistractorRow {
                model_id: row.model_id,
                family: row.family,
                easier,
                harder,
                drop: easier - harder,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.drop.total_cmp(&a.drop).then_with(|| a.model_id.cmp(&b.model_id)));
    rows
}
