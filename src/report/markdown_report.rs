//! @ai:module:intent Markdown report generation
//! @ai:module:layer infrastructure
//! @ai:module:public_api MarkdownReporter
//! @ai:module:stateless true

use crate::compose::CompositeTable;
use crate::config::CompositeMetric;
use crate::pipeline::AnalysisResults;
use anyhow::Result;
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// @ai:intent Trait for Markdown report generation
pub trait MarkdownReporterTrait: Send + Sync {
    /// @ai:intent Generate Markdown report from results
    fn generate(&self, results: &AnalysisResults, output_path: &Path) -> Result<()>;
}

/// @ai:intent Renders analysis tables as Markdown
pub struct MarkdownReporter;

impl MarkdownReporter {
    /// @ai:intent Create a new Markdown reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Format a 0..1 rate as a percentage
    /// @ai:effects pure
    fn format_rate(value: f64) -> String {
        format!("{:.1}%", value * 100.0)
    }

    /// @ai:intent Format a signed 0..1 difference in percentage points
    /// @ai:effects pure
    fn format_delta(value: f64) -> String {
        if value >= 0.0 {
            format!("+{:.1}pp", value * 100.0)
        } else {
            format!("{:.1}pp", value * 100.0)
        }
    }

    fn format_cost(value: Option<f64>) -> String {
        value.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string())
    }

    /// @ai:intent Format a composite cell according to its metric
    /// @ai:effects pure
    fn format_metric(metric: CompositeMetric, value: f64) -> String {
        match metric {
            CompositeMetric::MeanCost => format!("{:.0}", value),
            _ => Self::format_rate(value),
        }
    }

    /// @ai:intent Generate run overview section
    /// @ai:effects pure
    fn generate_summary(results: &AnalysisResults) -> String {
        let mut output = String::new();

        writeln!(output, "# Rollout Analysis").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "**Date:** {}", results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")).unwrap();
        writeln!(output, "**Input:** {}", results.input_root.display()).unwrap();
        writeln!(output, "**k:** {}", results.k).unwrap();
        writeln!(
            output,
            "**Sources:** {} seen, {} skipped",
            results.sources_seen,
            results.skipped.len()
        )
        .unwrap();
        writeln!(
            output,
            "**Records:** {} kept, {} excluded, {} examples",
            results.record_count,
            results.excluded_records(),
            results.example_count
        )
        .unwrap();
        writeln!(output).unwrap();

        output
    }

    fn generate_skipped_section(results: &AnalysisResults) -> String {
        let mut output = String::new();
        if results.skipped.is_empty() {
            return output;
        }

        writeln!(output, "## Skipped Sources").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "| Source | Reason |").unwrap();
        writeln!(output, "|--------|--------|").unwrap();
        for skipped in &results.skipped {
            writeln!(output, "| {} | {} |", skipped.path.display(), skipped.reason).unwrap();
        }
        writeln!(output).unwrap();

        output
    }

    /// @ai:intent Generate pass@1 vs pass@k per model
    /// @ai:effects pure
    fn generate_model_section(results: &AnalysisResults) -> String {
        let mut output = String::new();

        writeln!(output, "## Models").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "| Model | Examples | pass@1 | pass@{} | Gap |", results.k).unwrap();
        writeln!(output, "|-------|----------|--------|--------|-----|").unwrap();

        for summary in &results.model_summaries {
            writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                summary.model_id,
                summary.n_examples,
                Self::format_rate(summary.pass_1),
                Self::format_rate(summary.pass_k),
                Self::format_delta(summary.pass_k - summary.pass_1)
            )
            .unwrap();
        }

        writeln!(output).unwrap();
        output
    }

    fn generate_score_section(results: &AnalysisResults) -> String {
        let mut output = String::new();

        writeln!(output, "## Scores by Model and Task").unwrap();
        writeln!(output).unwrap();
        writeln!(
            output,
            "| Model | Task | Examples | Samples | pass@1 | pass@k | Noise | Mean Cost |"
        )
        .unwrap();
        writeln!(output, "|-------|------|----------|---------|--------|--------|-------|-----------|").unwrap();

        for score in &results.model_task_scores {
            writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {:.3} | {} |",
                score.model_id,
                score.task_id,
                score.n_examples,
                score.n_samples,
                Self::format_rate(score.pass_1),
                Self::format_rate(score.pass_k),
                score.noise_score,
                Self::format_cost(score.mean_cost)
            )
            .unwrap();
        }

        writeln!(output).unwrap();
        output
    }

    fn generate_audit_section(results: &AnalysisResults) -> String {
        let mut output = String::new();

        writeln!(output, "## Task Noise Audit").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "| Task | Examples | Noise | Accuracy | Zone |").unwrap();
        writeln!(output, "|------|----------|-------|----------|------|").unwrap();

        for audit in &results.task_audit {
            writeln!(
                output,
                "| {} | {} | {:.3} | {} | {} |",
                audit.task_id,
                audit.n_examples,
                audit.noise_score,
                Self::format_rate(audit.mean_accuracy),
                audit.zone
            )
            .unwrap();
        }

        writeln!(output).unwrap();
        output
    }

    /// @ai:intent Generate one table per bucket comparison
    /// @ai:effects pure
    fn generate_composite_section(table: &CompositeTable) -> String {
        let mut output = String::new();

        writeln!(output, "## Composite: {} ({})", table.name, table.metric).unwrap();
        writeln!(output).unwrap();

        let header: Vec<&str> = table.buckets.iter().map(String::as_str).collect();
        writeln!(output, "| Model | Family | {} |", header.join(" | ")).unwrap();
        writeln!(output, "|-------|--------|{}", "------|".repeat(header.len())).unwrap();

        for row in &table.rows {
            let cells: Vec<String> = table
                .buckets
                .iter()
                .map(|b| {
                    row.scores
                        .get(b)
                        .map(|v| Self::format_metric(table.metric, *v))
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            writeln!(output, "| {} | {} | {} |", row.model_id, row.family, cells.join(" | ")).unwrap();
        }

        if !table.excluded_models.is_empty() {
            writeln!(output).unwrap();
            writeln!(
                output,
                "{} model(s) excluded for missing a bucket: {}",
                table.excluded_models.len(),
                table.excluded_models.join(", ")
            )
            .unwrap();
        }

        writeln!(output).unwrap();
        output
    }

    fn generate_distractor_section(results: &AnalysisResults) -> String {
        let mut output = String::new();
        if results.distractor.is_empty() {
            return output;
        }

        writeln!(output, "## Distractor Sensitivity").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "| Model | Family | Easier | Harder | Drop |").unwrap();
        writeln!(output, "|-------|--------|--------|--------|------|").unwrap();

        for row in &results.distractor {
            writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                row.model_id,
                row.family,
                Self::format_rate(row.easier),
                Self::format_rate(row.harder),
                Self::format_delta(row.drop)
            )
            .unwrap();
        }

        writeln!(output).unwrap();
        output
    }

    /// @ai:intent Generate cost efficiency tables
    /// @ai:effects pure
    fn generate_cost_section(results: &AnalysisResults) -> String {
        let mut output = String::new();

        if !results.model_efficiency.is_empty() {
            writeln!(output, "## Model Efficiency").unwrap();
            writeln!(output).unwrap();
            writeln!(output, "| Model | Family | Records | Accuracy | Mean Cost |").unwrap();
            writeln!(output, "|-------|--------|---------|----------|-----------|").unwrap();
            for row in &results.model_efficiency {
                writeln!(
                    output,
                    "| {} | {} | {} | {} | {:.0} |",
                    row.model_id,
                    row.family,
                    row.n_records,
                    Self::format_rate(row.accuracy),
                    row.mean_cost
                )
                .unwrap();
            }
            writeln!(output).unwrap();
        }

        if !results.efficiency_curve.is_empty() {
            writeln!(output, "## Accuracy by Cost").unwrap();
            writeln!(output).unwrap();
            writeln!(output, "| Family | Bin Start | Records | Mean Reward |").unwrap();
            writeln!(output, "|--------|-----------|---------|-------------|").unwrap();
            for bin in &results.efficiency_curve {
                writeln!(
                    output,
                    "| {} | {:.0} | {} | {:.3} |",
                    bin.family, bin.bin_start, bin.n_records, bin.mean_reward
                )
                .unwrap();
            }
            writeln!(output).unwrap();
        }

        if !results.outcome_lengths.is_empty() {
            writeln!(output, "## Completion Length by Outcome").unwrap();
            writeln!(output).unwrap();
            writeln!(output, "| Model | Outcome | Records | Mean | Q1 | Median | Q3 |").unwrap();
            writeln!(output, "|-------|---------|---------|------|----|--------|----|").unwrap();
            for row in &results.outcome_lengths {
                writeln!(
                    output,
                    "| {} | {} | {} | {:.0} | {:.0} | {:.0} | {:.0} |",
                    row.model_id, row.outcome, row.n_records, row.mean_cost, row.q1, row.median, row.q3
                )
                .unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn generate_bias_section(results: &AnalysisResults) -> String {
        let mut output = String::new();
        let Some(first) = results.answer_bias.first() else {
            return output;
        };

        let labels: Vec<&str> = first.counts.keys().map(String::as_str).collect();

        writeln!(output, "## Answer Position Bias").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "| Model | Mean Reward | Answers | {} |", labels.join(" | ")).unwrap();
        writeln!(output, "|-------|-------------|---------|{}", "---|".repeat(labels.len())).unwrap();

        for row in &results.answer_bias {
            let shares: Vec<String> = labels
                .iter()
                .map(|l| Self::format_rate(row.share(l)))
                .collect();
            writeln!(
                output,
                "| {} | {:.3} | {} | {} |",
                row.model_id,
                row.mean_reward,
                row.total,
                shares.join(" | ")
            )
            .unwrap();
        }

        writeln!(output).unwrap();
        output
    }
}

impl Default for MarkdownReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownReporterTrait for MarkdownReporter {
    /// @ai:intent Generate Markdown report to file
    /// @ai:effects fs:write
    fn generate(&self, results: &AnalysisResults, output_path: &Path) -> Result<()> {
        let mut content = String::new();

        content.push_str(&Self::generate_summary(results));
        content.push_str(&Self::generate_skipped_section(results));
        content.push_str(&Self::generate_model_section(results));
        content.push_str(&Self::generate_score_section(results));
        content.push_str(&Self::generate_audit_section(results));
        for table in &results.composites {
            content.push_str(&Self::generate_composite_section(table));
        }
        content.push_str(&Self::generate_distractor_section(results));
        content.push_str(&Self::generate_cost_section(results));
        content.push_str(&Self::generate_bias_section(results));

        std::fs::write(output_path, content)?;
        Ok(())
    }
}
