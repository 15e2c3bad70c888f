//! @ai:module:intent Run loader, normalizer, aggregator, estimator and composer in order
//! @ai:module:layer application
//! @ai:module:public_api AnalysisResults, run_analysis, analyze_outcome

use crate::compose::{
    answer_distribution, compose, distractor_sensitivity, efficiency_curve, model_efficiency,
    outcome_lengths, AnswerDistribution, CompositeTable, CostBin, DistractorRow, FamilyClassifier,
    ModelEfficiency, OutcomeLength, TaskBuckets,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::{LoadOutcome, RecordLoader, RecordLoaderTrait, SkippedSource};
use crate::metrics::{
    select_k, ModelPassSummary, ModelTaskScore, RolloutAggregator, RolloutAggregatorTrait,
    StatisticalEstimator, StatisticalEstimatorTrait, TaskNoiseAudit,
};
use crate::normalize::{BatchStats, SchemaNormalizer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// @ai:intent Every table one analysis run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub timestamp: DateTime<Utc>,
    pub input_root: PathBuf,
    pub k: u32,
    pub sources_seen: usize,
    pub skipped: Vec<SkippedSource>,
    pub batch_stats: Vec<BatchStats>,
    pub record_count: usize,
    pub example_count: usize,
    pub model_task_scores: Vec<ModelTaskScore>,
    pub model_summaries: Vec<ModelPassSummary>,
    pub task_audit: Vec<TaskNoiseAudit>,
    pub composites: Vec<CompositeTable>,
    pub distractor: Vec<DistractorRow>,
    pub efficiency_curve: Vec<CostBin>,
    pub model_efficiency: Vec<ModelEfficiency>,
    pub outcome_lengths: Vec<OutcomeLength>,
    pub answer_bias: Vec<AnswerDistribution>,
}

impl AnalysisResults {
    /// @ai:intent Records dropped during normalization, over all batches
    /// @ai:effects pure
    pub fn excluded_records(&self) -> usize {
        self.batch_stats.iter().map(|s| s.excluded()).sum()
    }

    /// @ai:intent Find a composite table by name
    /// @ai:effects pure
    pub fn composite(&self, name: &str) -> Option<&CompositeTable> {
        self.composites.iter().find(|c| c.name == name)
    }
}

/// @ai:intent Load sources under the configured root and analyze them
/// @ai:effects fs:read
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisResults, AnalysisError> {
    config.validate()?;

    let root = &config.input.root;
    tracing::info!("Loading rollouts from {}", root.display());

    let loader = RecordLoader::with_filter(&config.filter)?;
    let outcome = loader.load_all(root);

    analyze_outcome(config, &outcome)
}

/// @ai:intent Analyze an already loaded set of batches
/// @ai:effects pure
pub fn analyze_outcome(
    config: &AnalysisConfig,
    outcome: &LoadOutcome,
) -> Result<AnalysisResults, AnalysisError> {
    if outcome.batches.is_empty() {
        if outcome.sources_seen == 0 {
            return Err(AnalysisError::NoSources {
                root: config.input.root.clone(),
            });
        }
        return Err(AnalysisError::NoRecords {
            sources: outcome.sources_seen,
        });
    }
    tracing::info!(
        "Loaded {} rows from {} batches ({} skipped)",
        outcome.row_count(),
        outcome.batches.len(),
        outcome.skipped.len()
    );

    let table = SchemaNormalizer::from_config(&config.cost).normalize(outcome);
    if table.records.is_empty() {
        return Err(AnalysisError::NoRecords {
            sources: outcome.batches.len(),
        });
    }

    let aggregates = RolloutAggregator::from_config(&config.scoring, &config.cost)
        .aggregate(&table.records);
    let k = select_k(&aggregates, &config.pass_k).ok_or(AnalysisError::NoRecords {
        sources: outcome.batches.len(),
    })?;
    tracing::info!("Estimating pass@{} over {} examples", k, aggregates.len());

    let estimator = StatisticalEstimator::new(k);
    let model_task_scores = estimator.score_tasks(&aggregates);
    let model_summaries = estimator.summarize_models(&aggregates);
    let task_audit = estimator.audit_tasks(&aggregates, &config.audit);

    let buckets = TaskBuckets::from_config(&config.buckets)?;
    let families = FamilyClassifier::from_config(&config.families)?;

    let composites = config
        .comparisons
        .iter()
        .map(|c| {
            compose(
                &c.name,
                &model_task_scores,
                &buckets,
                &c.buckets,
                c.metric,
                &families,
            )
        })
        .collect();

    let distractor = config
        .distractor
        .as_ref()
        .map(|d| distractor_sensitivity(&model_task_scores, d, &families))
        .unwrap_or_default();

    let cost = &config.cost;
    let efficiency = &config.efficiency;

    let results = AnalysisResults {
        timestamp: Utc::now(),
        input_root: config.input.root.clone(),
        k,
        sources_seen: outcome.sources_seen,
        skipped: outcome.skipped.clone(),
        record_count: table.records.len(),
        example_count: aggregates.len(),
        efficiency_curve: efficiency_curve(
            &table.records,
            &efficiency.curve_tasks,
            &families,
            cost.bin_width,
            cost.ceiling,
        ),
        model_efficiency: model_efficiency(
            &table.records,
            &efficiency.model_tasks,
            &families,
            cost.ceiling,
        ),
        outcome_lengths: outcome_lengths(
            &table.records,
            &families,
            &efficiency.length_family,
            config.scoring.correct_threshold,
            cost.ceiling,
        ),
        answer_bias: answer_distribution(&table.records, &config.bias),
        batch_stats: table.stats,
        model_task_scores,
        model_summaries,
        task_audit,
        composites,
        distractor,
    };

    tracing::info!(
        "Analysis complete: {} records, {} model-task scores",
        results.record_count,
        results.model_task_scores.len()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_source(dir: &Path, name: &str, lines: &[&str]) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = std::fs::File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn config_for(root: &Path) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.input.root = root.to_path_buf();
        config
    }

    #[test]
    fn test_end_to_end_with_one_corrupt_source() {
        let temp = TempDir::new().unwrap();
        create_source(
            temp.path(),
            "qwq-32b/medqa.jsonl",
            &[
                r#"{"example_id": 1, "reward": 1, "model_token_completion": 500, "answer": "A"}"#,
                r#"{"example_id": 1, "reward": 1, "model_token_completion": 700, "answer": "A"}"#,
                r#"{"example_id": 1, "reward": 0, "model_token_completion": 900, "answer": "B"}"#,
                r#"{"example_id": 1, "reward": 0, "model_token_completion": 1100, "answer": "C"}"#,
            ],
        );
        create_source(
            temp.path(),
            "qwq-32b/m_arc.jsonl",
            &[
                r#"{"example_id": "a", "reward": 0.0}"#,
                r#"{"example_id": "a", "reward": 1.0}"#,
            ],
        );
        create_source(temp.path(), "qwq-32b/pubmedqa.jsonl", &[r#"{"example_id": 1, "rew"#]);

        let results = run_analysis(&config_for(temp.path())).unwrap();

        assert_eq!(results.sources_seen, 3);
        assert_eq!(results.skipped.len(), 1);
        assert_eq!(results.record_count, 6);
        assert_eq!(results.k, 4);

        let medqa = results
            .model_task_scores
            .iter()
            .find(|s| s.task_id == "medqa")
            .unwrap();
        assert_eq!(medqa.pass_1, 0.5);
        assert_eq!(medqa.pass_k, 1.0);
        assert_eq!(medqa.mean_cost, Some(800.0));

        let kvr = results.composite("knowledge_vs_reasoning").unwrap();
        assert_eq!(kvr.rows.len(), 1);
        assert_eq!(kvr.rows[0].family, "thinking");

        assert_eq!(results.answer_bias.len(), 1);
        assert_eq!(results.answer_bias[0].counts["A"], 2);
        assert_eq!(results.outcome_lengths.len(), 2);
    }

    #[test]
    fn test_cost_tables_share_the_ceiling() {
        let temp = TempDir::new().unwrap();
        create_source(
            temp.path(),
            "m/medqa.jsonl",
            &[
                r#"{"example_id": 1, "reward": 1, "model_token_completion": 100}"#,
                r#"{"example_id": 2, "reward": 0, "model_token_completion": 50000}"#,
            ],
        );
        create_source(
            temp.path(),
            "m/m_arc.jsonl",
            &[r#"{"example_id": 1, "reward": 1, "model_token_completion": 300}"#],
        );

        let results = run_analysis(&config_for(temp.path())).unwrap();

        assert_eq!(results.record_count, 3);
        let medqa = results
            .model_task_scores
            .iter()
            .find(|s| s.task_id == "medqa")
            .unwrap();
        assert_eq!(medqa.n_examples, 2);
        assert_eq!(medqa.mean_cost, Some(100.0));

        let cost = results.composite("cost_by_bucket").unwrap();
        assert_eq!(cost.rows[0].scores["knowledge"], 100.0);
        assert_eq!(cost.rows[0].scores["reasoning"], 300.0);

        let efficiency = results
            .model_efficiency
            .iter()
            .find(|e| e.model_id == "m")
            .unwrap();
        assert_eq!(efficiency.n_records, 2);
        assert_eq!(efficiency.mean_cost, 200.0);
    }

    #[test]
    fn test_parquet_only_root_is_analyzed() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("m")).unwrap();
        crate::loader::reader::fixtures::write_parquet(
            &temp.path().join("m/medqa.parquet"),
            &[1, 1],
            &[1.0, 0.0],
            &[Some("A"), Some("B")],
        );

        let results = run_analysis(&config_for(temp.path())).unwrap();

        assert!(results.skipped.is_empty());
        assert_eq!(results.record_count, 2);
        assert_eq!(results.model_task_scores[0].pass_1, 0.5);
    }

    #[test]
    fn test_empty_root_is_no_sources() {
        let temp = TempDir::new().unwrap();
        let result = run_analysis(&config_for(temp.path()));
        assert!(matches!(result, Err(AnalysisError::NoSources { .. })));
    }

    #[test]
    fn test_only_corrupt_sources_is_no_records() {
        let temp = TempDir::new().unwrap();
        create_source(temp.path(), "m/medqa.jsonl", &["not json"]);
        let result = run_analysis(&config_for(temp.path()));
        assert!(matches!(result, Err(AnalysisError::NoRecords { sources: 1 })));
    }

    #[test]
    fn test_rows_without_reward_is_no_records() {
        let temp = TempDir::new().unwrap();
        create_source(temp.path(), "m/medqa.jsonl", &[r#"{"example_id": 1, "reward": "yes"}"#]);
        let result = run_analysis(&config_for(temp.path()));
        assert!(matches!(result, Err(AnalysisError::NoRecords { .. })));
    }

    #[test]
    fn test_invalid_config_fails_before_loading() {
        let temp = TempDir::new().unwrap();
        let mut config = config_for(temp.path());
        config.buckets.clear();
        assert!(matches!(run_analysis(&config), Err(AnalysisError::NoBuckets)));
    }

    #[test]
    fn test_results_round_trip_through_json() {
        let temp = TempDir::new().unwrap();
        create_source(temp.path(), "m/medqa.jsonl", &[r#"{"example_id": 1, "reward": 1}"#]);
        let results = run_analysis(&config_for(temp.path())).unwrap();

        let json = serde_json::to_string(&results).unwrap();
        let parsed: AnalysisResults = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model_task_scores, results.model_task_scores);
        assert_eq!(parsed.k, 1);
    }
}
