use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::info;

use ondemand_nat_core::config::{IDLE_MINUTES_ENV, NETWORK_ID_ENV, WAIT_MINUTES_ENV};
use ondemand_nat_core::{
    JobDescriptor, JobReporter, NatError, NatResult, Reconciler, Settings, Summary, TriggerEvent,
    report_outcome,
};
use ondemand_nat_provider_aws::{CodePipelineReporter, Ec2Network, load_config};

#[derive(Parser)]
#[command(name = "ondemand-nat")]
#[command(
    about = "Launches a shared NAT gateway on demand and removes it when idle",
    long_about = None
)]
struct Cli {
    /// Target network (VPC) id [env: VPC_ID]
    #[arg(long, global = true)]
    network_id: Option<String>,

    /// AWS region (defaults to the SDK provider chain)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Minutes of inactivity before an unused gateway is deleted [env: NAT_IDLE_MINUTES]
    #[arg(long, global = true)]
    idle_minutes: Option<u64>,

    /// Minutes to wait for a new gateway to become available [env: NAT_WAIT_MINUTES]
    #[arg(long, global = true)]
    wait_minutes: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch, refresh or sweep depending on current demand
    Reconcile {
        /// Trigger payload (JSON file, or - for stdin)
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Make sure a gateway exists now, reporting to the pipeline job if any
    Request {
        /// Trigger payload (JSON file, or - for stdin)
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Refresh or sweep existing gateways without launching
    Check {
        /// Trigger payload (JSON file, or - for stdin)
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Show demand and gateway presence without changing anything
    Status,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli, |key| std::env::var(key).ok()).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<(), String> {
    let config = load_config(cli.region.as_deref()).await;
    let network = Arc::new(Ec2Network::new(&config));

    match &cli.command {
        Commands::Reconcile { event } => {
            read_event(event.as_deref())?;
            let reconciler = build_reconciler(cli, env, network)?;
            let summary = reconciler.reconcile().await.map_err(describe)?;
            print_json(serde_json::to_value(&summary))
        }
        Commands::Request { event } => {
            // The job id must be known before anything else can fail
            let event = read_event(event.as_deref())?;
            let reporter = CodePipelineReporter::new(&config);
            let settings = load_settings(cli, env);
            let summary = request_with_report(&reporter, event.job.as_ref(), settings, |settings| {
                async move {
                    info!("Managing NAT gateway for network {}", settings.network_id);
                    let reconciler = Reconciler::new(network, &settings);
                    reconciler.request_on_demand().await
                }
            })
            .await
            .map_err(describe)?;
            print_json(serde_json::to_value(&summary))
        }
        Commands::Check { event } => {
            read_event(event.as_deref())?;
            let reconciler = build_reconciler(cli, env, network)?;
            let summary = reconciler
                .check_still_required()
                .await
                .map_err(describe)?;
            print_json(serde_json::to_value(&summary))
        }
        Commands::Status => {
            let reconciler = build_reconciler(cli, env, network)?;
            let status = reconciler.status().await.map_err(describe)?;
            print_json(serde_json::to_value(&status))
        }
    }
}

fn build_reconciler(
    cli: &Cli,
    env: impl Fn(&str) -> Option<String>,
    network: Arc<Ec2Network>,
) -> Result<Reconciler, String> {
    let settings = load_settings(cli, env).map_err(describe)?;
    info!("Managing NAT gateway for network {}", settings.network_id);
    Ok(Reconciler::new(network, &settings))
}

/// Run a request and report its outcome, settings failures included
///
/// Settings are loaded once the job id is known, so a missing or invalid
/// setting fails the pipeline job instead of leaving it waiting.
async fn request_with_report<F, Fut>(
    reporter: &dyn JobReporter,
    job: Option<&JobDescriptor>,
    settings: NatResult<Settings>,
    request: F,
) -> NatResult<Summary>
where
    F: FnOnce(Settings) -> Fut,
    Fut: Future<Output = NatResult<Summary>>,
{
    let result = match settings {
        Ok(settings) => request(settings).await,
        Err(e) => Err(e),
    };
    report_outcome(reporter, job, result).await
}

/// Error text for the terminal, with a hint for account setup problems
fn describe(e: NatError) -> String {
    if e.is_precondition() {
        format!("{} (check the address and subnet tags in the account)", e)
    } else {
        e.to_string()
    }
}

/// Build settings from command-line overrides, falling back to `lookup`
fn load_settings(cli: &Cli, lookup: impl Fn(&str) -> Option<String>) -> NatResult<Settings> {
    let mut overrides: HashMap<&str, String> = HashMap::new();
    if let Some(id) = &cli.network_id {
        overrides.insert(NETWORK_ID_ENV, id.clone());
    }
    if let Some(minutes) = cli.idle_minutes {
        overrides.insert(IDLE_MINUTES_ENV, minutes.to_string());
    }
    if let Some(minutes) = cli.wait_minutes {
        overrides.insert(WAIT_MINUTES_ENV, minutes.to_string());
    }

    Ok(Settings::from_lookup(|key| overrides.get(key).cloned().or_else(|| lookup(key)))?)
}

/// Read the trigger payload; no path means an empty event
fn read_event(path: Option<&Path>) -> Result<TriggerEvent, String> {
    let content = match path {
        None => return Ok(TriggerEvent::default()),
        Some(p) if p == Path::new("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read event from stdin: {}", e))?;
            buf
        }
        Some(p) => fs::read_to_string(p)
            .map_err(|e| format!("Failed to read {}: {}", p.display(), e))?,
    };

    TriggerEvent::from_json(&content).map_err(|e| e.to_string())
}

fn print_json(value: Result<serde_json::Value, serde_json::Error>) -> Result<(), String> {
    let value = value.map_err(|e| format!("Failed to serialize result: {}", e))?;
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| format!("Failed to serialize result: {}", e))?;
    println!("{}", text);
    Ok(())
}
