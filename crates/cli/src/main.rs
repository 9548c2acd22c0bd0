//! Greenup CLI - vegetation-index time series sampling

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use greenup_algorithms::statistics::GridMeanReducer;
use greenup_core::SensorProfile;
use greenup_pipeline::{CollectionPipeline, CsvSink, LocalCatalog, ProcessingMode, RunConfig, RunReport};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "greenup")]
#[command(author, version, about = "Vegetation-index time series from scene collections", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample a collection over the configured regions and write a CSV table
    Run {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
        /// STAC ItemCollection with local GeoTIFF assets
        #[arg(long)]
        catalog: PathBuf,
        /// Directory receiving `<outputDescription>.csv`
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Worker threads (overrides the configuration)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Output description (overrides the configuration)
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Print the built-in sensor profiles as JSON
    Profiles,
    /// Validate a run configuration without reading any scene
    Check {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_config(path: &Path) -> Result<RunConfig> {
    RunConfig::from_path(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))
}

fn build_pipeline(config: &RunConfig) -> Result<CollectionPipeline> {
    CollectionPipeline::new(config).context("Invalid run configuration")
}

fn summary(report: &RunReport, elapsed: std::time::Duration) {
    println!(
        "Scenes: {} queried, {} in range, {} processed, {} skipped",
        report.scenes_queried,
        report.scenes_filtered,
        report.scenes_processed,
        report.skipped.len()
    );
    for s in &report.skipped {
        println!("  skipped {} at {}: {}", s.scene_id, s.stage, s.reason);
    }
    println!(
        "Records: {} exported, {} dropped (undefined index)",
        report.records_exported, report.records_dropped
    );
    for w in &report.warnings {
        println!("Warning: {}", w);
    }
    println!("  Processing time: {:.2?}", elapsed);
}

fn done(name: &str, path: &Path) {
    println!("{} saved to: {}", name, path.display());
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            catalog,
            out_dir,
            threads,
            description,
        } => {
            let mut cfg = read_config(&config)?;
            if threads.is_some() {
                cfg.threads = threads;
            }
            if let Some(d) = description {
                cfg.output_description = d;
            }
            let pipeline = build_pipeline(&cfg)?;
            if let ProcessingMode::Parallel = pipeline.mode() {
                info!("Using {} threads", greenup_pipeline::strategy::num_cpus());
            }

            let pb = spinner("Reading catalog...");
            let source = LocalCatalog::open(&catalog)
                .with_context(|| format!("Failed to open catalog {}", catalog.display()))?;
            pb.finish_and_clear();
            info!("Catalog: {} item(s)", source.len());

            let start = Instant::now();
            let pb = spinner("Sampling scenes...");
            let mut sink = CsvSink::new(out_dir.clone());
            let report = pipeline
                .run(&source, &GridMeanReducer, &mut sink)
                .context("Run failed")?;
            pb.finish_and_clear();

            summary(&report, start.elapsed());
            if let Some(path) = sink.written() {
                done("Table", path);
            }
        }

        Commands::Profiles => {
            let profiles = SensorProfile::builtins();
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }

        Commands::Check { config } => {
            let cfg = read_config(&config)?;
            let pipeline = build_pipeline(&cfg)?;
            println!("Configuration OK");
            println!("  Sensor: {} ({})", pipeline.profile().id, pipeline.profile().collection_id);
            println!("  Dates: {}", pipeline.date_range());
            println!("  Regions: {}", pipeline.regions().len());
            println!("  Stages: {}", pipeline.stage_names().join(" -> "));
            println!("  Output: {}.csv", pipeline.description());
            for w in pipeline.warnings() {
                println!("Warning: {}", w);
            }
        }
    }

    Ok(())
}
