//! @ai:module:intent Configuration structs for an analysis run
//! @ai:module:layer infrastructure
//! @ai:module:public_api AnalysisConfig, FilterConfig, RuleConfig, CompositeMetric
//! @ai:module:stateless true

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// @ai:intent Main configuration for the analysis pipeline
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub pass_k: PassKConfig,
    #[serde(default)]
    pub cost: CostConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub efficiency: EfficiencyConfig,
    #[serde(default)]
    pub bias: BiasConfig,
    #[serde(default = "default_distractor")]
    pub distractor: Option<DistractorConfig>,
    #[serde(default = "default_families")]
    pub families: FamilyConfig,
    #[serde(default = "default_buckets")]
    pub buckets: Vec<RuleConfig>,
    #[serde(default = "default_comparisons")]
    pub comparisons: Vec<ComparisonConfig>,
}

/// @ai:intent Where rollout files are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

/// @ai:intent Filter configuration for selecting sources
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Substrings matched against the task (file stem)
    pub tasks: Option<Vec<String>>,
    /// Substrings matched against the model (directory name)
    pub models: Option<Vec<String>>,
    /// Regular expression matched against the task
    pub pattern: Option<String>,
}

/// @ai:intent How a reward is binarized into correct/incorrect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// A sample is correct when `reward > correct_threshold`
    #[serde(default)]
    pub correct_threshold: f64,
}

/// @ai:intent Budget selection for the pass@k estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassKConfig {
    /// Upper bound on the observed-maximum policy
    #[serde(default = "default_k_cap")]
    pub cap: Option<u32>,
    /// Fixed budget, overrides the observed-maximum policy
    #[serde(default)]
    pub k: Option<u32>,
}

/// @ai:intent Token-cost outlier handling and binning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    #[serde(default = "default_cost_ceiling")]
    pub ceiling: f64,
    /// Drop records above the ceiling from every table, not only cost aggregates
    #[serde(default)]
    pub exclude_outliers: bool,
    #[serde(default = "default_bin_width")]
    pub bin_width: f64,
}

/// @ai:intent Thresholds for the per-task signal/noise audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: f64,
    #[serde(default = "default_chance_level")]
    pub chance_level: f64,
}

/// @ai:intent Task selection for the cost-vs-accuracy tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficiencyConfig {
    /// Tasks feeding the binned efficiency curve (empty = all)
    #[serde(default = "default_curve_tasks")]
    pub curve_tasks: Vec<String>,
    /// Tasks feeding the per-model efficiency table (empty = all)
    #[serde(default = "default_model_tasks")]
    pub model_tasks: Vec<String>,
    /// Family whose completion lengths are split by outcome
    #[serde(default = "default_length_family")]
    pub length_family: String,
}

/// @ai:intent Positional-bias check settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasConfig {
    #[serde(default = "default_bias_task")]
    pub task: Option<String>,
    #[serde(default = "default_top_models")]
    pub top_models: usize,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

/// @ai:intent Pair of task variants differing only in distractor count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistractorConfig {
    pub easier: String,
    pub harder: String,
}

/// @ai:intent Model family rules, first match wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    #[serde(default = "default_family_label")]
    pub default_label: String,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// @ai:intent One labelled membership rule
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub label: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// @ai:intent A cross-bucket composite to compute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub name: String,
    pub buckets: Vec<String>,
    #[serde(default)]
    pub metric: CompositeMetric,
}

/// @ai:intent Which per-(model, task) column a composite averages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMetric {
    #[default]
    #[serde(rename = "pass_1")]
    Pass1,
    PassK,
    MeanReward,
    MeanCost,
}

impl CompositeMetric {
    /// @ai:intent Column name of the metric
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeMetric::Pass1 => "pass_1",
            CompositeMetric::PassK => "pass_k",
            CompositeMetric::MeanReward => "mean_reward",
            CompositeMetric::MeanCost => "mean_cost",
        }
    }
}

impl std::fmt::Display for CompositeMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            filter: FilterConfig::default(),
            scoring: ScoringConfig::default(),
            pass_k: PassKConfig::default(),
            cost: CostConfig::default(),
            audit: AuditConfig::default(),
            efficiency: EfficiencyConfig::default(),
            bias: BiasConfig::default(),
            distractor: default_distractor(),
            families: default_families(),
            buckets: default_buckets(),
            comparisons: default_comparisons(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            correct_threshold: 0.0,
        }
    }
}

impl Default for PassKConfig {
    fn default() -> Self {
        Self {
            cap: default_k_cap(),
            k: None,
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            ceiling: default_cost_ceiling(),
            exclude_outliers: false,
            bin_width: default_bin_width(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            noise_threshold: default_noise_threshold(),
            chance_level: default_chance_level(),
        }
    }
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            curve_tasks: default_curve_tasks(),
            model_tasks: default_model_tasks(),
            length_family: default_length_family(),
        }
    }
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            task: default_bias_task(),
            top_models: default_top_models(),
            labels: default_labels(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("inference-scratch")
}

fn default_k_cap() -> Option<u32> {
    Some(8)
}

fn default_cost_ceiling() -> f64 {
    8000.0
}

fn default_bin_width() -> f64 {
    200.0
}

fn default_noise_threshold() -> f64 {
    0.25
}

fn default_chance_level() -> f64 {
    0.5
}

fn default_curve_tasks() -> Vec<String> {
    strings(&["medqa", "medxpertqa-reasoning"])
}

fn default_model_tasks() -> Vec<String> {
    strings(&[
        "medqa",
        "medxpertqa-reasoning",
        "medcalc_bench",
        "mmlu_pro_health",
        "m_arc",
    ])
}

fn default_length_family() -> String {
    "thinking".to_string()
}

fn default_bias_task() -> Option<String> {
    Some("medqa".to_string())
}

fn default_top_models() -> usize {
    6
}

fn default_labels() -> Vec<String> {
    strings(&["A", "B", "C", "D", "E"])
}

fn default_family_label() -> String {
    "standard".to_string()
}

fn default_distractor() -> Option<DistractorConfig> {
    Some(DistractorConfig {
        easier: "medbullets-op4".to_string(),
        harder: "medbullets-op5".to_string(),
    })
}

fn default_families() -> FamilyConfig {
    FamilyConfig {
        default_label: default_family_label(),
        rules: vec![RuleConfig {
            label: "thinking".to_string(),
            keywords: strings(&[
                "think",
                "reason",
                "qwq",
                "intellect",
                "gpt-oss",
                "sonnet-4_5",
                "gpt_5_1",
            ]),
            patterns: vec![],
        }],
    }
}

fn default_buckets() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            label: "knowledge".to_string(),
            keywords: strings(&[
                "medqa",
                "medbullets-op5",
                "medbullets-op4",
                "pubmedqa",
                "med_mcqa",
                "mmlu_pro_health",
                "metamedqa",
                "medconceptsqa",
            ]),
            patterns: vec![],
        },
        RuleConfig {
            label: "reasoning".to_string(),
            keywords: strings(&[
                "medxpertqa-reasoning",
                "medxpertqa-understanding",
                "m_arc",
                "longhealth",
                "medcalc_bench",
            ]),
            patterns: vec![],
        },
    ]
}

fn default_comparisons() -> Vec<ComparisonConfig> {
    vec![
        ComparisonConfig {
            name: "knowledge_vs_reasoning".to_string(),
            buckets: strings(&["knowledge", "reasoning"]),
            metric: CompositeMetric::Pass1,
        },
        ComparisonConfig {
            name: "cost_by_bucket".to_string(),
            buckets: strings(&["knowledge", "reasoning"]),
            metric: CompositeMetric::MeanCost,
        },
    ]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl AnalysisConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// @ai:intent Reject configurations that cannot produce a meaningful run
    /// @ai:effects pure
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.buckets.is_empty() {
            return Err(AnalysisError::NoBuckets);
        }

        for bucket in &self.buckets {
            if bucket.keywords.is_empty() && bucket.patterns.is_empty() {
                return Err(AnalysisError::EmptyBucket(bucket.label.clone()));
            }
        }

        let labels: HashSet<&str> = self.buckets.iter().map(|b| b.label.as_str()).collect();
        for comparison in &self.comparisons {
            let mut seen = HashSet::new();
            if let Some(duplicate) = comparison.buckets.iter().find(|b| !seen.insert(b.as_str())) {
                return Err(AnalysisError::DuplicateBucket {
                    comparison: comparison.name.clone(),
                    bucket: duplicate.clone(),
                });
            }

            if let Some(missing) = comparison
                .buckets
                .iter()
                .find(|b| !labels.contains(b.as_str()))
            {
                return Err(AnalysisError::UnknownBucket {
                    comparison: comparison.name.clone(),
                    bucket: missing.clone(),
                });
            }
        }

        if !(self.cost.bin_width > 0.0) {
            return Err(AnalysisError::InvalidBinWidth(self.cost.bin_width));
        }

        Ok(())
    }
}

impl FilterConfig {
    /// @ai:intent Check if the substring filters match a source
    /// @ai:effects pure
    pub fn matches(&self, model: &str, task: &str) -> bool {
        let task_lower = task.to_lowercase();
        let model_lower = model.to_lowercase();

        let task_match = self
            .tasks
            .as_ref()
            .map(|t| t.iter().any(|k| task_lower.contains(&k.to_lowercase())))
            .unwrap_or(true);

        let model_match = self
            .models
            .as_ref()
            .map(|m| m.iter().any(|k| model_lower.contains(&k.to_lowercase())))
            .unwrap_or(true);

        task_match && model_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_all_when_empty() {
        let filter = FilterConfig::default();
        assert!(filter.matches("llama-3-70b", "medqa"));
    }

    #[test]
    fn test_filter_matches_task_substring() {
        let filter = FilterConfig {
            tasks: Some(vec!["medbullets".to_string()]),
            ..Default::default()
        };
        assert!(filter.matches("llama-3-70b", "medbullets-op4"));
        assert!(filter.matches("llama-3-70b", "MedBullets-op5"));
        assert!(!filter.matches("llama-3-70b", "medqa"));
    }

    #[test]
    fn test_filter_matches_multiple_criteria() {
        let filter = FilterConfig {
            tasks: Some(vec!["medqa".to_string()]),
            models: Some(vec!["qwq".to_string(), "gemma".to_string()]),
            ..Default::default()
        };
        assert!(filter.matches("qwq-32b", "medqa"));
        assert!(filter.matches("gemma-3-27b", "pubmedqa"));
        assert!(!filter.matches("llama-3-70b", "medqa"));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pass_k.cap, Some(8));
        assert_eq!(config.cost.ceiling, 8000.0);
    }

    #[test]
    fn test_validate_rejects_empty_bucket() {
        let mut config = AnalysisConfig::default();
        config.buckets[0].keywords.clear();
        match config.validate() {
            Err(AnalysisError::EmptyBucket(label)) => assert_eq!(label, "knowledge"),
            other => panic!("expected EmptyBucket, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_unknown_bucket() {
        let mut config = AnalysisConfig::default();
        config.comparisons[0].buckets.push("recall".to_string());
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::UnknownBucket { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_buckets_and_bad_width() {
        let mut config = AnalysisConfig::default();
        config.cost.bin_width = 0.0;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidBinWidth(_))
        ));

        config.buckets.clear();
        assert!(matches!(config.validate(), Err(AnalysisError::NoBuckets)));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let content = r#"
[pass_k]
k = 4

[[buckets]]
label = "recall"
keywords = ["pubmedqa"]
"#;
        let config: AnalysisConfig = toml::from_str(content).unwrap();
        assert_eq!(config.pass_k.k, Some(4));
        assert_eq!(config.pass_k.cap, Some(8));
        assert_eq!(config.buckets.len(), 1);
        assert_eq!(config.families.default_label, "standard");
        assert_eq!(config.cost.bin_width, 200.0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("rollout-stats.toml");
        let config = AnalysisConfig::default();
        config.save(&path).unwrap();

        let loaded = AnalysisConfig::load(&path).unwrap();
        assert_eq!(loaded.buckets.len(), config.buckets.len());
        assert_eq!(loaded.comparisons[1].metric, CompositeMetric::MeanCost);
        assert_eq!(loaded.bias.labels, config.bias.labels);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config: AnalysisConfig = toml::from_str(include_str!("../rollout-stats.toml")).unwrap();
        let defaults = AnalysisConfig::default();

        config.validate().unwrap();
        assert_eq!(config.buckets[0].keywords, defaults.buckets[0].keywords);
        assert_eq!(config.families.rules[0].keywords, defaults.families.rules[0].keywords);
        assert_eq!(config.comparisons[0].metric, CompositeMetric::Pass1);
        assert_eq!(config.pass_k.k, None);
    }

    #[test]
    fn test_validate_rejects_repeated_bucket_in_comparison() {
        let mut config = AnalysisConfig::default();
        config.comparisons[0].buckets = vec!["knowledge".to_string(), "knowledge".to_string()];

        match config.validate() {
            Err(AnalysisError::DuplicateBucket { comparison, bucket }) => {
                assert_eq!(comparison, "knowledge_vs_reasoning");
                assert_eq!(bucket, "knowledge");
            }
            other => panic!("expected DuplicateBucket, got {:?}", other),
        }
    }
}
