//! @ai:module:intent Map heterogeneous raw rows onto canonical rollout records
//! @ai:module:layer domain
//! @ai:module:public_api RolloutRecord, SchemaNormalizer, NormalizedTable, BatchStats
//! @ai:module:stateless true

use crate::config::CostConfig;
use crate::loader::{LoadOutcome, RawBatch, RawRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source field names carrying completion cost, in order of preference.
pub const COST_FIELDS: &[&str] = &["model_token_completion", "generation_token_count"];

/// @ai:intent One observed sample of a model on a task example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutRecord {
    pub model_id: String,
    pub task_id: String,
    pub example_id: String,
    pub reward: f64,
    pub completion_cost: Option<f64>,
    pub answer_label: Option<String>,
}

/// @ai:intent Per-batch accounting of kept and excluded rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub model_id: String,
    pub task_id: String,
    pub rows_in: usize,
    pub rows_kept: usize,
    pub missing_example_id: usize,
    pub missing_reward: usize,
    pub non_numeric_reward: usize,
    pub cost_outliers: usize,
}

impl BatchStats {
    /// @ai:intent Rows dropped for any reason
    /// @ai:effects pure
    pub fn excluded(&self) -> usize {
        self.rows_in - self.rows_kept
    }
}

/// @ai:intent Canonical records plus exclusion counts for every batch
#[derive(Debug, Clone, Default)]
pub struct NormalizedTable {
    pub records: Vec<RolloutRecord>,
    pub stats: Vec<BatchStats>,
}

/// @ai:intent Why a single row could not become a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowIssue {
    MissingExampleId,
    MissingReward,
    NonNumericReward,
}

/// @ai:intent Reconciles column variants and fills identity from provenance
pub struct SchemaNormalizer {
    cost_ceiling: Option<f64>,
}

impl SchemaNormalizer {
    /// @ai:intent Create a normalizer without the cost outlier filter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self { cost_ceiling: None }
    }

    /// @ai:intent Create a normalizer honoring the configured outlier filter
    /// @ai:effects pure
    pub fn from_config(cost: &CostConfig) -> Self {
        Self {
            cost_ceiling: cost.exclude_outliers.then_some(cost.ceiling),
        }
    }

    /// @ai:intent Normalize every batch of a load
    /// @ai:effects pure
    pub fn normalize(&self, outcome: &LoadOutcome) -> NormalizedTable {
        let mut table = NormalizedTable::default();

        for batch in outcome.batches.values() {
            let stats = self.normalize_batch(batch, &mut table.records);
            if stats.excluded() > 0 {
                tracing::warn!(
                    "Excluded {} of {} rows from {}/{} (missing example_id {}, missing reward {}, non-numeric reward {}, cost outliers {})",
                    stats.excluded(),
                    stats.rows_in,
                    stats.model_id,
                    stats.task_id,
                    stats.missing_example_id,
                    stats.missing_reward,
                    stats.non_numeric_reward,
                    stats.cost_outliers
                );
            }
            table.stats.push(stats);
        }

        table
    }

    /// @ai:intent Normalize one batch, appending kept records to `out`
    /// @ai:effects pure
    pub fn normalize_batch(&self, batch: &RawBatch, out: &mut Vec<RolloutRecord>) -> BatchStats {
        let mut stats = BatchStats {
            model_id: batch.tag.model_id.clone(),
            task_id: batch.tag.task_id.clone(),
            rows_in: batch.rows.len(),
            ..Default::default()
        };

        for row in &batch.rows {
            let record = match normalize_row(row, &batch.tag.model_id, &batch.tag.task_id) {
                Ok(record) => record,
                Err(RowIssue::MissingExampleId) => {
                    stats.missing_example_id += 1;
                    continue;
                }
                Err(RowIssue::MissingReward) => {
                    stats.missing_reward += 1;
                    continue;
                }
                Err(RowIssue::NonNumericReward) => {
                    stats.non_numeric_reward += 1;
                    continue;
                }
            };

            if self.is_outlier(&record) {
                stats.cost_outliers += 1;
                continue;
            }

            stats.rows_kept += 1;
            out.push(record);
        }

        stats
    }

    fn is_outlier(&self, record: &RolloutRecord) -> bool {
        match (self.cost_ceiling, record.completion_cost) {
            (Some(ceiling), Some(cost)) => cost > ceiling,
            _ => false,
        }
    }
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_row(row: &RawRow, fallback_model: &str, task_id: &str) -> Result<RolloutRecord, RowIssue> {
    let example_id = row
        .get("example_id")
        .and_then(identifier)
        .ok_or(RowIssue::MissingExampleId)?;

    let reward = match row.get("reward") {
        None | Some(Value::Null) => return Err(RowIssue::MissingReward),
        Some(value) => numeric(value).ok_or(RowIssue::NonNumericReward)?,
    };

    let model_id = row
        .get("model_id")
        .and_then(identifier)
        .unwrap_or_else(|| fallback_model.to_string());

    let completion_cost = COST_FIELDS
        .iter()
        .find_map(|field| row.get(*field).and_then(numeric));

    let answer_label = row
        .get("answer")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());

    Ok(RolloutRecord {
        model_id,
        task_id: task_id.to_string(),
        example_id,
        reward,
        completion_cost,
        answer_label,
    })
}

/// @ai:intent Coerce an identifying field to a string without losing its spelling
/// @ai:effects pure
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// @ai:intent Read a finite number; booleans count as 1/0
/// @ai:effects pure
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SourceTag;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn batch(model: &str, task: &str, rows: Vec<Value>) -> RawBatch {
        RawBatch {
            tag: SourceTag {
                model_id: model.to_string(),
                task_id: task.to_string(),
            },
            paths: vec![],
            rows: rows
                .into_iter()
                .map(|v| match v {
                    Value::Object(map) => map,
                    _ => panic!("test rows must be objects"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_model_id_falls_back_to_provenance() {
        let b = batch(
            "llama-3-70b",
            "medqa",
            vec![
                json!({"example_id": "q1", "reward": 1.0}),
                json!({"example_id": "q2", "reward": 0.0, "model_id": "gemma-3-27b"}),
                json!({"example_id": "q3", "reward": 0.0, "model_id": null}),
            ],
        );
        let mut out = Vec::new();
        SchemaNormalizer::new().normalize_batch(&b, &mut out);

        let models: Vec<&str> = out.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(models, vec!["llama-3-70b", "gemma-3-27b", "llama-3-70b"]);
        assert!(out.iter().all(|r| r.task_id == "medqa"));
    }

    #[test]
    fn test_numeric_identifiers_keep_their_spelling() {
        let b = batch(
            "m",
            "t",
            vec![
                json!({"example_id": 7, "reward": 1, "model_id": 1}),
                json!({"example_id": 7.0, "reward": 1, "model_id": 1.0}),
            ],
        );
        let mut out = Vec::new();
        SchemaNormalizer::new().normalize_batch(&b, &mut out);

        assert_eq!(out[0].example_id, "7");
        assert_eq!(out[1].example_id, "7.0");
        assert_ne!(out[0].model_id, out[1].model_id);
    }

    #[test]
    fn test_cost_aliases_and_absence() {
        let b = batch(
            "m",
            "t",
            vec![
                json!({"example_id": 1, "reward": 1, "model_token_completion": 420}),
                json!({"example_id": 2, "reward": 1, "generation_token_count": 310.5}),
                json!({"example_id": 3, "reward": 1}),
                json!({"example_id": 4, "reward": 1, "model_token_completion": null, "generation_token_count": 90}),
            ],
        );
        let mut out = Vec::new();
        SchemaNormalizer::new().normalize_batch(&b, &mut out);

        let costs: Vec<Option<f64>> = out.iter().map(|r| r.completion_cost).collect();
        assert_eq!(costs, vec![Some(420.0), Some(310.5), None, Some(90.0)]);
    }

    #[test]
    fn test_bad_rows_are_counted_per_batch() {
        let b = batch(
            "m",
            "t",
            vec![
                json!({"example_id": 1, "reward": 1}),
                json!({"example_id": 2}),
                json!({"example_id": 3, "reward": null}),
                json!({"example_id": 4, "reward": "correct"}),
                json!({"reward": 1}),
                json!({"example_id": 5, "reward": true, "answer": " b "}),
            ],
        );
        let mut out = Vec::new();
        let stats = SchemaNormalizer::new().normalize_batch(&b, &mut out);

        assert_eq!(stats.rows_in, 6);
        assert_eq!(stats.rows_kept, 2);
        assert_eq!(stats.missing_reward, 2);
        assert_eq!(stats.non_numeric_reward, 1);
        assert_eq!(stats.missing_example_id, 1);
        assert_eq!(stats.excluded(), 4);
        assert_eq!(out[1].reward, 1.0);
        assert_eq!(out[1].answer_label.as_deref(), Some("B"));
    }

    #[test]
    fn test_outlier_filter_is_opt_in() {
        let b = batch(
            "m",
            "t",
            vec![
                json!({"example_id": 1, "reward": 1, "model_token_completion": 9000}),
                json!({"example_id": 2, "reward": 1, "model_token_completion": 8000}),
                json!({"example_id": 3, "reward": 1}),
            ],
        );

        let mut out = Vec::new();
        let stats = SchemaNormalizer::new().normalize_batch(&b, &mut out);
        assert_eq!(stats.cost_outliers, 0);
        assert_eq!(out.len(), 3);

        let filtering = SchemaNormalizer::from_config(&CostConfig {
            exclude_outliers: true,
            ..Default::default()
        });
        let mut out = Vec::new();
        let stats = filtering.normalize_batch(&b, &mut out);
        assert_eq!(stats.cost_outliers, 1);
        assert_eq!(out.len(), 2);
    }
}
