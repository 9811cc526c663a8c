//! CLI command definitions for fleetlock.
//!
//! Two commands are provided: `simulate` runs the fleet lock comparison and
//! `api-docs` refreshes a YAML copy of a service's OpenAPI document.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::apidocs::{self, DocBranding, ServerEntry};
use crate::lock::find_overlap;
use crate::metrics::{export_metrics, init_metrics, ComparisonSummary};
use crate::scheduler::{CycleOrchestrator, SimulationConfig, SimulationRun, WorkDuration};

/// Default output file for `api-docs`.
const DEFAULT_API_DOCS_OUTPUT: &str = "swagger.yaml";

/// Simulates a fleet of schedulers with and without a distributed lock.
#[derive(Parser)]
#[command(name = "fleetlock")]
#[command(about = "Compare duplicate job executions across a fleet with and without a lock")]
#[command(version)]
#[command(
    long_about = "fleetlock simulates redundant scheduler instances that fire the same periodic job.\n\nEach cycle runs the job once under a shared lock and once without it, then reports how many duplicate executions the lock prevented.\n\nExample usage:\n  fleetlock simulate --instances seoul-8001,seoul-8002,seoul-8003 --cycles 4"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run protected and unprotected scheduling cycles and compare them.
    #[command(alias = "sim")]
    Simulate(SimulateArgs),

    /// Fetch an OpenAPI JSON document, brand it and save it as YAML.
    #[command(name = "api-docs")]
    ApiDocs(ApiDocsArgs),
}

/// Arguments for `fleetlock simulate`.
///
/// Flags override values loaded from `--config`.
#[derive(Parser, Debug, Default)]
pub struct SimulateArgs {
    /// YAML configuration file (can also be set via FLEETLOCK_CONFIG env var).
    #[arg(short = 'c', long, env = "FLEETLOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Comma-separated fleet instance ids.
    #[arg(short = 'i', long, value_delimiter = ',')]
    pub instances: Option<Vec<String>>,

    /// Number of scheduling cycles.
    #[arg(short = 'n', long)]
    pub cycles: Option<usize>,

    /// Pause between cycles in milliseconds.
    #[arg(long)]
    pub cycle_delay_ms: Option<u64>,

    /// Pause between the protected and unprotected rounds in milliseconds.
    #[arg(long)]
    pub round_delay_ms: Option<u64>,

    /// Lower bound of protected work time in milliseconds.
    #[arg(long)]
    pub min_work_ms: Option<u64>,

    /// Upper bound of protected work time in milliseconds.
    #[arg(long)]
    pub max_work_ms: Option<u64>,

    /// Work time of unprotected executions in milliseconds.
    #[arg(long)]
    pub unprotected_work_ms: Option<u64>,

    /// Seed for reproducible work times.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Name of the shared lock.
    #[arg(long)]
    pub lock_name: Option<String>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    pub metrics: bool,
}

impl SimulateArgs {
    /// Builds the effective configuration from the file and flag overrides.
    pub fn to_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(instances) = &self.instances {
            config.instances = instances.iter().map(|id| id.trim().to_string()).collect();
        }
        if let Some(cycles) = self.cycles {
            config = config.with_cycles(cycles);
        }
        if let Some(ms) = self.cycle_delay_ms {
            config = config.with_cycle_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.round_delay_ms {
            config = config.with_round_delay(Duration::from_millis(ms));
        }
        if self.min_work_ms.is_some() || self.max_work_ms.is_some() {
            let current = config.protected_work;
            let min = self
                .min_work_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| current.min());
            let max = self
                .max_work_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| current.max());
            config = config.with_protected_work(WorkDuration::uniform(min, max));
        }
        if let Some(ms) = self.unprotected_work_ms {
            config = config.with_unprotected_work(Duration::from_millis(ms));
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(name) = &self.lock_name {
            config = config.with_lock_name(name.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for `fleetlock api-docs`.
#[derive(Parser, Debug)]
pub struct ApiDocsArgs {
    /// URL of the OpenAPI JSON endpoint (e.g. http://localhost:8080/v3/api-docs).
    pub url: String,

    /// Output YAML file.
    #[arg(short = 'o', long, default_value = DEFAULT_API_DOCS_OUTPUT)]
    pub output: PathBuf,

    /// Replacement for `info.title`.
    #[arg(long)]
    pub title: Option<String>,

    /// Replacement for `info.description`.
    #[arg(long)]
    pub description: Option<String>,

    /// Replacement for `info.version`.
    #[arg(long)]
    pub doc_version: Option<String>,

    /// Value for `info.contact.name`.
    #[arg(long)]
    pub contact_name: Option<String>,

    /// Value for `info.contact.url`.
    #[arg(long)]
    pub contact_url: Option<String>,

    /// Server entry as URL or URL=DESCRIPTION. Repeat to list several;
    /// any occurrence replaces the document's servers.
    #[arg(long = "server")]
    pub servers: Vec<ServerEntry>,
}

impl ApiDocsArgs {
    pub fn branding(&self) -> DocBranding {
        DocBranding {
            title: self.title.clone(),
            description: self.description.clone(),
            version: self.doc_version.clone(),
            contact_name: self.contact_name.clone(),
            contact_url: self.contact_url.clone(),
            servers: self.servers.clone(),
        }
    }
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse CLI arguments and execute the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Simulate(args) => run_simulate_command(args).await,
        Commands::ApiDocs(args) => run_api_docs_command(args).await,
    }
}

// ============================================================================
// Simulate Command Implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct SimulateOutput<'a> {
    status: &'static str,
    #[serde(flatten)]
    run: &'a SimulationRun,
    reduction_rate_rounded: f64,
}

async fn run_simulate_command(args: SimulateArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;

    if args.metrics {
        init_metrics().context("Failed to initialize metrics")?;
    }

    let orchestrator = CycleOrchestrator::new(config)?;
    let lock = Arc::clone(orchestrator.lock());
    let run = orchestrator.run().await;

    if let Some((first, second)) = find_overlap(&lock.history()) {
        anyhow::bail!(
            "Mutual exclusion violated: '{}' and '{}' held the lock at the same time",
            first.holder,
            second.holder
        );
    }

    if args.json {
        let output = SimulateOutput {
            status: "success",
            run: &run,
            reduction_rate_rounded: run.summary.reduction_rate_rounded(),
        };
        let json_output = serde_json::to_string_pretty(&output)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
    } else {
        info!(
            run_id = %run.run_id,
            protected = run.summary.protected_count(),
            unprotected = run.summary.unprotected_count()
        );
        print_summary(&run);
    }

    if args.metrics {
        print!("{}", export_metrics());
    }

    Ok(())
}

fn print_summary(run: &SimulationRun) {
    let summary: &ComparisonSummary = &run.summary;

    println!("✓ Simulation completed");
    println!("  Run id:    {}", run.run_id);
    println!(
        "  Fleet:     {} instances, {} cycles",
        run.config.instances.len(),
        run.cycles.len()
    );
    println!();

    for report in &run.cycles {
        let winners = if report.protected_winners.is_empty() {
            "-".to_string()
        } else {
            report.protected_winners.join(", ")
        };
        println!(
            "  Cycle {}: lock winner {}, {} skipped, {} unprotected runs",
            report.cycle + 1,
            winners,
            report.skipped.len(),
            report.unprotected_executions
        );
        for failure in &report.failures {
            println!("    [{}] {}", failure.mode.tag(), failure.error);
        }
    }
    println!();

    println!(
        "  With lock:    {} executions on {} instances",
        summary.protected_count(),
        summary.protected.instance_count()
    );
    println!(
        "  Without lock: {} executions on {} instances",
        summary.unprotected_count(),
        summary.unprotected.instance_count()
    );
    println!(
        "  Prevented:    {} duplicate executions ({:.1}% reduction)",
        summary.prevented_executions,
        summary.reduction_rate_rounded()
    );
    println!("  Verdict:      {}", summary.verdict);
}

// ============================================================================
// API Docs Command Implementation
// ============================================================================

async fn run_api_docs_command(args: ApiDocsArgs) -> anyhow::Result<()> {
    info!(url = %args.url, "Fetching OpenAPI document");
    let document = apidocs::fetch(&args.url).await?;

    let document = apidocs::enhance(document, &args.branding());

    apidocs::save(&document, &args.output)?;

    println!("✓ OpenAPI YAML saved to {}", args.output.display());
    println!("  API paths:   {}", document.path_count());
    println!("  API title:   {}", document.title().unwrap_or("Unknown"));
    println!("  API version: {}", document.version().unwrap_or("Unknown"));

    Ok(())
}
