//! @ai:module:intent Ordered, data-driven membership rules for tasks and models
//! @ai:module:layer domain
//! @ai:module:public_api Matcher, KeywordRule, RuleSet, TaskBuckets, FamilyClassifier
//! @ai:module:stateless true

use crate::config::{FamilyConfig, RuleConfig};
use crate::error::AnalysisError;
use regex::{Regex, RegexBuilder};

/// @ai:intent One membership test against a lower-cased identifier
#[derive(Debug, Clone)]
pub enum Matcher {
    Contains(String),
    Pattern(Regex),
}

impl Matcher {
    /// @ai:intent Build a case-insensitive substring matcher
    /// @ai:effects pure
    pub fn contains(keyword: &str) -> Self {
        Matcher::Contains(keyword.to_lowercase())
    }

    /// @ai:intent Build a case-insensitive regex matcher
    /// @ai:effects pure
    pub fn pattern(pattern: &str) -> Result<Self, AnalysisError> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Matcher::Pattern)
            .map_err(|source| AnalysisError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    fn matches(&self, lower: &str) -> bool {
        match self {
            Matcher::Contains(keyword) => lower.contains(keyword.as_str()),
            Matcher::Pattern(re) => re.is_match(lower),
        }
    }
}

/// @ai:intent A label and the matchers that grant it
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub label: String,
    matchers: Vec<Matcher>,
}

impl KeywordRule {
    /// @ai:intent Create a rule from plain keywords
    /// @ai:effects pure
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            matchers: keywords.iter().map(|k| Matcher::contains(k)).collect(),
        }
    }

    /// @ai:intent Create a rule from its configuration entry
    /// @ai:effects pure
    pub fn from_config(config: &RuleConfig) -> Result<Self, AnalysisError> {
        let mut matchers: Vec<Matcher> = config.keywords.iter().map(|k| Matcher::contains(k)).collect();
        for pattern in &config.patterns {
            matchers.push(Matcher::pattern(pattern)?);
        }

        Ok(Self {
            label: config.label.clone(),
            matchers,
        })
    }

    /// @ai:intent Whether any matcher accepts the identifier
    /// @ai:effects pure
    pub fn matches(&self, id: &str) -> bool {
        let lower = id.to_lowercase();
        self.matchers.iter().any(|m| m.matches(&lower))
    }
}

/// @ai:intent Ordered list of labelled rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<KeywordRule>,
}

impl RuleSet {
    /// @ai:intent Create a rule set, preserving rule order
    /// @ai:effects pure
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    /// @ai:intent Build a rule set from configuration entries
    /// @ai:effects pure
    pub fn from_config(configs: &[RuleConfig]) -> Result<Self, AnalysisError> {
        let rules = configs
            .iter()
            .map(KeywordRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// @ai:intent Every label whose rule matches, in rule order
    /// @ai:effects pure
    pub fn labels_for(&self, id: &str) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.matches(id))
            .map(|r| r.label.as_str())
            .collect()
    }

    /// @ai:intent The first label whose rule matches
    /// @ai:effects pure
    pub fn first_match(&self, id: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.matches(id))
            .map(|r| r.label.as_str())
    }

    pub fn rule(&self, label: &str) -> Option<&KeywordRule> {
        self.rules.iter().find(|r| r.label == label)
    }
}

/// @ai:intent Maps task identifiers to zero or more bucket labels
#[derive(Debug, Clone)]
pub struct TaskBuckets {
    rules: RuleSet,
}

impl TaskBuckets {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// @ai:intent Build buckets from configuration
    /// @ai:effects pure
    pub fn from_config(configs: &[RuleConfig]) -> Result<Self, AnalysisError> {
        Ok(Self::new(RuleSet::from_config(configs)?))
    }

    /// @ai:intent All buckets a task belongs to
    /// @ai:effects pure
    pub fn buckets_for(&self, task_id: &str) -> Vec<&str> {
        self.rules.labels_for(task_id)
    }

    /// @ai:intent Whether a task belongs to a bucket
    /// @ai:effects pure
    pub fn contains(&self, label: &str, task_id: &str) -> bool {
        self.rules
            .rule(label)
            .map(|r| r.matches(task_id))
            .unwrap_or(false)
    }
}

/// @ai:intent Assigns each model exactly one family label
#[derive(Debug, Clone)]
pub struct FamilyClassifier {
    rules: RuleSet,
    default_label: String,
}

impl FamilyClassifier {
    /// @ai:intent Create a classifier with ordered rules and a fallback label
    /// @ai:effects pure
    pub fn new(rules: RuleSet, default_label: &str) -> Self {
        Self {
            rules,
            default_label: default_label.to_string(),
        }
    }

    /// @ai:intent Build the classifier from configuration
    /// @ai:effects pure
    pub fn from_config(config: &FamilyConfig) -> Result<Self, AnalysisError> {
        Ok(Self::new(
            RuleSet::from_config(&config.rules)?,
            &config.default_label,
        ))
    }

    /// @ai:intent Family of a model, first matching rule wins
    /// @ai:effects pure
    pub fn classify(&self, model_id: &str) -> &str {
        self.rules
            .first_match(model_id)
            .unwrap_or(self.default_label.as_str())
    }
}

/// @ai:intent Whether an id contains any of the keywords; no keywords selects everything
/// @ai:effects pure
pub fn selects(keywords: &[String], id: &str) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let lower = id.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use pretty_assertions::assert_eq;

    fn default_buckets() -> TaskBuckets {
        TaskBuckets::from_config(&AnalysisConfig::default().buckets).unwrap()
    }

    fn default_families() -> FamilyClassifier {
        FamilyClassifier::from_config(&AnalysisConfig::default().families).unwrap()
    }

    #[test]
    fn test_task_buckets_zero_or_more() {
        let buckets = default_buckets();
        assert_eq!(buckets.buckets_for("medbullets-op4"), vec!["knowledge"]);
        assert_eq!(buckets.buckets_for("MedXpertQA-Reasoning"), vec!["reasoning"]);
        assert!(buckets.buckets_for("arc_easy").is_empty());

        let overlapping = TaskBuckets::new(RuleSet::new(vec![
            KeywordRule::new("knowledge", &["medqa"]),
            KeywordRule::new("med", &["med"]),
        ]));
        assert_eq!(overlapping.buckets_for("pubmedqa"), vec!["knowledge", "med"]);
    }

    #[test]
    fn test_bucket_contains() {
        let buckets = default_buckets();
        assert!(buckets.contains("reasoning", "longhealth"));
        assert!(!buckets.contains("knowledge", "longhealth"));
        assert!(!buckets.contains("missing", "longhealth"));
    }

    #[test]
    fn test_family_classification_is_case_insensitive() {
        let families = default_families();
        assert_eq!(families.classify("QwQ-32B"), "thinking");
        assert_eq!(families.classify("deepseek-r1-Reasoning"), "thinking");
        assert_eq!(families.classify("gpt-oss-120b"), "thinking");
        assert_eq!(families.classify("llama-3-70b-instruct"), "standard");
    }

    #[test]
    fn test_first_matching_family_wins() {
        let families = FamilyClassifier::new(
            RuleSet::new(vec![
                KeywordRule::new("distilled", &["distill"]),
                KeywordRule::new("thinking", &["r1", "think"]),
            ]),
            "standard",
        );
        assert_eq!(families.classify("deepseek-r1-distill-qwen"), "distilled");
        assert_eq!(families.classify("deepseek-r1"), "thinking");
        assert_eq!(families.classify("mistral-large"), "standard");
    }

    #[test]
    fn test_pattern_rules() {
        let rule = KeywordRule::from_config(&RuleConfig {
            label: "options".to_string(),
            keywords: vec![],
            patterns: vec![r"-op\d$".to_string()],
        })
        .unwrap();
        assert!(rule.matches("MedBullets-OP5"));
        assert!(!rule.matches("medbullets-op5-extra"));

        let bad = KeywordRule::from_config(&RuleConfig {
            label: "bad".to_string(),
            keywords: vec![],
            patterns: vec!["(".to_string()],
        });
        assert!(matches!(bad, Err(AnalysisError::InvalidPattern { .. })));
    }

    #[test]
    fn test_selects() {
        assert!(selects(&[], "anything"));
        let keywords = vec!["MedQA".to_string()];
        assert!(selects(&keywords, "pubmedqa"));
        assert!(!selects(&keywords, "m_arc"));
    }
}
