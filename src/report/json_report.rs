//! @ai:module:intent JSON report generation
//! @ai:module:layer infrastructure
//! @ai:module:public_api JsonReporter
//! @ai:module:stateless true

use crate::pipeline::AnalysisResults;
use anyhow::{Context, Result};
use std::path::Path;

/// @ai:intent Trait for JSON report generation
pub trait JsonReporterTrait: Send + Sync {
    /// @ai:intent Generate JSON report from results
    fn generate(&self, results: &AnalysisResults, output_path: &Path) -> Result<()>;
}

/// @ai:intent Writes analysis results as pretty-printed JSON
pub struct JsonReporter;

impl JsonReporterTrait for JsonReporter {
    /// @ai:effects fs:write
    fn generate(&self, results: &AnalysisResults, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("writing {}", output_path.display()))?;

        tracing::debug!(
            "Wrote {} model-task scores to {}",
            results.model_task_scores.len(),
            output_path.display()
        );
        Ok(())
    }
}
