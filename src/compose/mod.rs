//! @ai:module:intent Group tasks and models into categories and compare them
//! @ai:module:layer application
//! @ai:module:public_api TaskBuckets, FamilyClassifier, compose, distractor_sensitivity, efficiency_curve, answer_distribution
//! @ai:module:stateless true

pub mod bias;
pub mod composite;
pub mod cost;
pub mod rules;

pub use bias::{answer_distribution, AnswerDistribution};
pub use composite::{compose, distractor_sensitivity, CompositeTable, DistractorRow, ModelCompositeScore};
pub use cost::{
    cost_bin, efficiency_curve, model_efficiency, outcome_lengths, CostBin, ModelEfficiency,
    OutcomeLength,
};
pub use rules::{selects, FamilyClassifier, KeywordRule, Matcher, RuleSet, TaskBuckets};
