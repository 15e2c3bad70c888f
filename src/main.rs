//! @ai:module:intent CLI for rollout evaluation statistics
//! @ai:module:layer presentation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollout_stats::{
    config::AnalysisConfig,
    error::AnalysisError,
    loader::{RecordLoader, RecordLoaderTrait},
    pipeline::{run_analysis, AnalysisResults},
    report::ReportGenerator,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status when a run finds nothing to analyze.
const NO_DATA_EXIT: u8 = 2;

#[derive(Parser)]
#[command(name = "rollout-stats")]
#[command(about = "Aggregate repeated-sampling evaluation rollouts into pass@k tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze rollouts and write reports
    Analyze {
        /// Root directory laid out as <model>/<task>.jsonl
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Filter by task name substrings (comma-separated)
        #[arg(long)]
        tasks: Option<String>,

        /// Filter by model name substrings (comma-separated)
        #[arg(long)]
        models: Option<String>,

        /// Regex applied to task names
        #[arg(long)]
        pattern: Option<String>,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Generate reports from existing results
    Report {
        /// Path to results JSON file
        #[arg(short, long)]
        results: PathBuf,

        /// Output directory for reports
        #[arg(short, long, default_value = "reports")]
        output: PathBuf,
    },

    /// Check which sources load and which are skipped
    Validate {
        /// Root directory to scan
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "rollout-stats.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rollout_stats=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            tasks,
            models,
            pattern,
            output,
        } => analyze(AnalyzeArgs {
            input,
            config,
            tasks,
            models,
            pattern,
            output,
        }),
        Commands::Report { results, output } => generate_reports(results, output),
        Commands::Validate { input, config } => validate(input, config),
        Commands::Init { output } => init_config(output),
    }
}

struct AnalyzeArgs {
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    tasks: Option<String>,
    models: Option<String>,
    pattern: Option<String>,
    output: PathBuf,
}

/// @ai:intent Run the analysis and write reports
/// @ai:effects fs:read, fs:write
fn analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let mut config = load_or_default_config(args.config)?;
    if let Some(input) = args.input {
        config.input.root = input;
    }
    if let Some(tasks) = args.tasks {
        config.filter.tasks = Some(split_list(&tasks));
    }
    if let Some(models) = args.models {
        config.filter.models = Some(split_list(&models));
    }
    if args.pattern.is_some() {
        config.filter.pattern = args.pattern;
    }

    let results = match run_analysis(&config) {
        Ok(results) => results,
        Err(e) => return Ok(no_data(&e)),
    };

    let timestamp = results.timestamp.format("%Y-%m-%d_%H-%M-%S");
    let output_dir = args.output.join(timestamp.to_string());

    ReportGenerator::new().generate_all(&results, &output_dir)?;
    print_summary(&results);

    Ok(ExitCode::SUCCESS)
}

/// @ai:intent Report a terminal "no data" outcome
/// @ai:effects io
fn no_data(error: &AnalysisError) -> ExitCode {
    tracing::error!("{}", error);
    eprintln!("No data: {}", error);
    ExitCode::from(NO_DATA_EXIT)
}

/// @ai:intent Generate reports from results file
/// @ai:effects fs:read, fs:write
fn generate_reports(results_path: PathBuf, output_dir: PathBuf) -> Result<ExitCode> {
    let results = ReportGenerator::load_results(&results_path)?;

    let reporter = ReportGenerator::new();
    reporter.generate_all(&results, &output_dir)?;

    println!("Reports generated in {}", output_dir.display());
    Ok(ExitCode::SUCCESS)
}

/// @ai:intent List loadable and skipped sources without analyzing them
/// @ai:effects fs:read
fn validate(input: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<ExitCode> {
    let mut config = load_or_default_config(config_path)?;
    if let Some(input) = input {
        config.input.root = input;
    }

    if let Err(e) = config.validate() {
        return Ok(no_data(&e));
    }
    let loader = match RecordLoader::with_filter(&config.filter) {
        Ok(loader) => loader,
        Err(e) => return Ok(no_data(&e)),
    };
    let outcome = loader.load_all(&config.input.root);

    if outcome.sources_seen == 0 {
        return Ok(no_data(&AnalysisError::NoSources {
            root: config.input.root,
        }));
    }

    println!(
        "Sources: {} seen, {} loaded, {} skipped",
        outcome.sources_seen,
        outcome.batches.len(),
        outcome.skipped.len()
    );
    println!();
    println!("{:<30} {:<30} {:>10}", "Model", "Task", "Rows");
    println!("{}", "-".repeat(72));

    for (tag, batch) in &outcome.batches {
        println!("{:<30} {:<30} {:>10}", tag.model_id, tag.task_id, batch.rows.len());
    }

    if !outcome.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for skipped in &outcome.skipped {
            println!("  - {} ({})", skipped.path.display(), skipped.reason);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// @ai:intent Initialize default configuration file
/// @ai:effects fs:write
fn init_config(output: PathBuf) -> Result<ExitCode> {
    let config = AnalysisConfig::default();
    config
        .save(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Configuration saved to {}", output.display());
    Ok(ExitCode::SUCCESS)
}

/// @ai:intent Load configuration or use defaults
/// @ai:effects fs:read
fn load_or_default_config(path: Option<PathBuf>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => AnalysisConfig::load(&p).with_context(|| format!("loading {}", p.display())),
        None => {
            let default_path = PathBuf::from("rollout-stats.toml");

            if default_path.exists() {
                AnalysisConfig::load(&default_path)
            } else {
                Ok(AnalysisConfig::default())
            }
        }
    }
}

/// @ai:intent Split a comma-separated CLI value
/// @ai:effects pure
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// @ai:intent Print summary to console
/// @ai:effects io
fn print_summary(results: &AnalysisResults) {
    println!();
    println!("Rollout Analysis");
    println!("================");
    println!();
    println!(
        "Sources: {} seen, {} skipped | Records: {} | Examples: {} | k = {}",
        results.sources_seen,
        results.skipped.len(),
        results.record_count,
        results.example_count,
        results.k
    );
    println!();

    println!(
        "{:<40} {:>10} {:>10} {:>10}",
        "Model",
        "Examples",
        "pass@1",
        format!("pass@{}", results.k)
    );
    println!("{}", "-".repeat(73));
    for summary in &results.model_summaries {
        println!(
            "{:<40} {:>10} {:>9.1}% {:>9.1}%",
            summary.model_id,
            summary.n_examples,
            summary.pass_1 * 100.0,
            summary.pass_k * 100.0
        );
    }
    println!();

    for table in &results.composites {
        println!(
            "{}: {} model(s) compared, {} excluded",
            table.name,
            table.rows.len(),
            table.excluded_models.len()
        );
    }
}
