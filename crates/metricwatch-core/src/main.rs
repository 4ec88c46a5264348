//! metricwatch CLI
//!
//! Validates monitor definitions and replays recorded metrics through them.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use metricwatch::aggregation::Aggregations;
use metricwatch::analysis::Analyses;
use metricwatch::config::{EngineConfig, LogFormat, LoggingConfig};
use metricwatch::models::Metric;
use metricwatch::monitor::{Engine, FileSource, InMemoryStateStore, Monitors};
use metricwatch::notificator::Notificators;
use metricwatch::prelude::{ComponentRegistry, PropertiesSource};

/// metricwatch - metric monitoring with pluggable analyses
#[derive(Parser)]
#[command(name = "metricwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "METRICWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Monitor definitions file, overrides `monitors.source`
    #[arg(short, long, global = true)]
    monitors: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every monitor and report problems
    Validate,

    /// Process recorded metrics and print raised notifications
    Replay {
        /// JSON lines file of metrics, `-` for stdin
        #[arg(long)]
        metrics: PathBuf,

        /// Print every analysis result as well
        #[arg(long)]
        results: bool,
    },

    /// List registered component types
    Components,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    let registry = Arc::new(ComponentRegistry::builtin_with_mode(config.registry.mode()));

    let result = match cli.command {
        Commands::Validate => run_validate(&config, cli.monitors.as_deref(), &registry),
        Commands::Replay { metrics, results } => run_replay(
            &config,
            cli.monitors.as_deref(),
            registry,
            &metrics,
            results,
        ),
        Commands::Components => {
            print_components(&registry);
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn monitors_source(config: &EngineConfig, override_path: Option<&Path>) -> anyhow::Result<FileSource> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(|| config.monitors.source.clone())
        .context("no monitor definitions, use --monitors or set monitors.source")?;

    Ok(FileSource::new(path))
}

fn run_validate(
    config: &EngineConfig,
    monitors_path: Option<&Path>,
    registry: &ComponentRegistry,
) -> anyhow::Result<bool> {
    let source = monitors_source(config, monitors_path)?;
    let properties = source
        .load()
        .with_context(|| format!("reading {}", source.path().display()))?;

    let monitors = Monitors::build(&properties, registry);

    for monitor in monitors.iter() {
        println!("ok      {}", monitor.id());
        for warning in monitor.warnings() {
            println!("        warning: {warning}");
        }
    }
    for (id, failure) in monitors.failures() {
        println!("failed  {id}: {failure}");
    }

    info!(
        valid = monitors.len(),
        failed = monitors.failures().len(),
        "Validation finished"
    );
    Ok(monitors.failures().is_empty())
}

fn run_replay(
    config: &EngineConfig,
    monitors_path: Option<&Path>,
    registry: Arc<ComponentRegistry>,
    metrics_path: &Path,
    print_results: bool,
) -> anyhow::Result<bool> {
    let source = monitors_source(config, monitors_path)?;
    let engine = Engine::new(
        registry,
        Arc::new(source),
        Arc::new(InMemoryStateStore::new()),
        &config.monitors,
    );

    let reader: Box<dyn BufRead> = if metrics_path == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(metrics_path)
            .with_context(|| format!("opening {}", metrics_path.display()))?;
        Box::new(BufReader::new(file))
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut processed = 0usize;
    let mut raised = 0usize;
    let mut failures = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let metric: Metric = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid metric", index + 1))?;
        let report = engine.process(&metric)?;

        if print_results {
            for result in &report.results {
                writeln!(out, "{}", serde_json::to_string(result)?)?;
            }
        }
        for notification in &report.notifications {
            writeln!(out, "{}", serde_json::to_string(notification)?)?;
        }

        processed += 1;
        raised += report.notifications.len();
        failures += report.failures.len();
    }

    info!(
        metrics = processed,
        notifications = raised,
        failures,
        "Replay finished"
    );
    Ok(failures == 0)
}

fn print_components(registry: &ComponentRegistry) {
    println!("analysis:     {}", registry.available::<Analyses>().join(", "));
    println!("aggregation:  {}", registry.available::<Aggregations>().join(", "));
    println!("notificator:  {}", registry.available::<Notificators>().join(", "));
}
