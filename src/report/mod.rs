//! @ai:module:intent Report generation for analysis results
//! @ai:module:layer infrastructure
//! @ai:module:public_api ReportGenerator, JsonReporter, MarkdownReporter

pub mod json_report;
pub mod markdown_report;

pub use json_report::{JsonReporter, JsonReporterTrait};
pub use markdown_report::{MarkdownReporter, MarkdownReporterTrait};

use crate::pipeline::AnalysisResults;
use anyhow::{Context, Result};
use std::path::Path;

/// @ai:intent Combined report generator
pub struct ReportGenerator {
    json: JsonReporter,
    markdown: MarkdownReporter,
}

impl ReportGenerator {
    /// @ai:intent Create a new report generator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            json: JsonReporter,
            markdown: MarkdownReporter::new(),
        }
    }

    /// @ai:intent Write results.json and results.md into a directory
    /// @ai:effects fs:write
    pub fn generate_all(&self, results: &AnalysisResults, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating {}", output_dir.display()))?;

        self.json.generate(results, &output_dir.join("results.json"))?;
        self.markdown
            .generate(results, &output_dir.join("results.md"))?;

        tracing::info!("Reports generated in {}", output_dir.display());
        Ok(())
    }

    /// @ai:intent Read previously written results back
    /// @ai:effects fs:read
    pub fn load_results(path: &Path) -> Result<AnalysisResults> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let results = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(results)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}
