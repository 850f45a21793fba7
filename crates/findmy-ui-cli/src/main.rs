//! Runner for the Find My UI scenarios.
//!
//! # Usage
//!
//! ```bash
//! # List the scenarios
//! findmy-ui list
//!
//! # Run every scenario on the first booted simulator
//! findmy-ui run
//!
//! # Run two scenarios on a given simulator and keep the report
//! findmy-ui --udid 1A2B... run device-play-sound clear-notifications --report run.jsonl
//!
//! # Try the suite against the built-in simulated app
//! findmy-ui --simulate run
//!
//! # Dump what is on screen right now
//! findmy-ui inspect
//! findmy-ui inspect --json
//!
//! # Simulators
//! findmy-ui devices
//! findmy-ui devices --boot 1A2B...
//!
//! # Shell completions
//! findmy-ui completions zsh > _findmy-ui
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use findmy_ui_core::axe::{Axe, AxeBackend};
use findmy_ui_core::backend::{AccessibilityBackend, BackendError};
use findmy_ui_core::config::{logs_dir, SuiteConfig};
use findmy_ui_core::context::TestContext;
use findmy_ui_core::error::UiError;
use findmy_ui_core::simctl::Simctl;
use findmy_ui_pages::navigation::NavigationError;
use findmy_ui_pages::scenarios::{self, Scenario, ScenarioOutcome};
use findmy_ui_pages::{fixture, inspect};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE: &str = "findmy-ui.log";

/// Runs Find My UI scenarios on the iOS Simulator.
#[derive(Parser)]
#[command(name = "findmy-ui")]
#[command(about = "Run Find My UI scenarios on the iOS Simulator")]
#[command(version)]
struct Cli {
    /// Simulator to drive (defaults to the first booted one)
    #[arg(short, long, global = true, env = "FINDMY_UI_UDID")]
    udid: Option<String>,

    /// Config file to use instead of ~/.findmy-ui/config.json
    #[arg(short, long, global = true, env = "FINDMY_UI_CONFIG")]
    config: Option<PathBuf>,

    /// Drive the built-in simulated app instead of a simulator
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List scenario names and descriptions
    List,

    /// Run scenarios in order (all of them when none are named)
    Run {
        /// Scenario names, as shown by `list`
        scenarios: Vec<String>,
        /// Write the action report as JSONL
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Describe the current screen
    Inspect {
        /// Print the raw accessibility tree instead
        #[arg(long)]
        json: bool,
    },

    /// List simulator devices
    Devices {
        /// Boot this device instead of listing
        #[arg(long, value_name = "UDID")]
        boot: Option<String>,
    },

    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Debug)]
enum CliError {
    /// At least one scenario failed an assertion or could not find an element.
    Failed(String),
    /// The simulator or its tooling is unusable.
    Environment(String),
    /// Bad arguments or config.
    Usage(String),
    Interrupted,
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Failed(_) => ExitCode::from(1),
            CliError::Environment(_) => ExitCode::from(2),
            CliError::Usage(_) => ExitCode::from(3),
            CliError::Interrupted => ExitCode::from(130),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Failed(msg) => write!(f, "Failed: {}", msg),
            CliError::Environment(msg) => write!(f, "Environment error: {}", msg),
            CliError::Usage(msg) => write!(f, "Usage error: {}", msg),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl From<UiError> for CliError {
    fn from(e: UiError) -> Self {
        if e.is_environment() {
            CliError::Environment(e.to_string())
        } else {
            CliError::Failed(e.to_string())
        }
    }
}

impl From<BackendError> for CliError {
    fn from(e: BackendError) -> Self {
        CliError::Environment(e.to_string())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let file_appender = tracing_appender::rolling::never(logs_dir(), LOG_FILE);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version come through here too
            let code = if e.use_stderr() { 3 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match run(cli, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    // Commands that never touch a device
    match cli.command {
        Command::List => {
            for scenario in scenarios::all() {
                println!("{:<26} {}", scenario.name(), scenario.description());
            }
            return Ok(());
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "findmy-ui", &mut std::io::stdout());
            return Ok(());
        }
        Command::Devices { ref boot } => return devices(boot.as_deref()),
        _ => {}
    }

    let config = load_config(&cli)?;
    let backend = open_backend(&cli, &config).await?;
    let mut ctx = TestContext::create(backend, config)?;

    match cli.command {
        Command::Run { scenarios: ref names, ref report } => {
            let selected = select_scenarios(names)?;
            let result = run_scenarios(&mut ctx, &selected, &cancel).await;
            if let Some(path) = report {
                write_report(&ctx, path).await?;
            }
            let disposed = ctx.dispose().await;
            result?;
            disposed?;
            Ok(())
        }
        Command::Inspect { json } => {
            if cli.simulate {
                ctx.launch_app().await?;
            }
            if json {
                let tree = inspect::tree_json(&ctx).await?;
                let text = serde_json::to_string_pretty(&tree)
                    .map_err(|e| CliError::Failed(format!("cannot serialize tree: {}", e)))?;
                println!("{}", text);
            } else {
                print!("{}", inspect::describe_screen(&ctx).await?);
            }
            Ok(())
        }
        // Handled above
        Command::List | Command::Completions { .. } | Command::Devices { .. } => unreachable!(),
    }
}

fn load_config(cli: &Cli) -> Result<SuiteConfig, CliError> {
    let mut config = match (&cli.config, cli.simulate) {
        (Some(path), _) => SuiteConfig::load_from(path).map_err(|e| CliError::Usage(e.to_string()))?,
        (None, true) => SuiteConfig::simulated(),
        (None, false) => SuiteConfig::load(),
    };
    if let Some(udid) = &cli.udid {
        config.udid = Some(udid.clone());
    }
    if config.log_dir.is_none() {
        config.log_dir = Some(logs_dir());
    }
    Ok(config)
}

async fn open_backend(cli: &Cli, config: &SuiteConfig) -> Result<Arc<dyn AccessibilityBackend>, CliError> {
    if cli.simulate {
        info!("using simulated Find My");
        return Ok(Arc::new(fixture::backend()));
    }
    if !Axe::is_installed() {
        return Err(BackendError::NotInstalled("axe".to_string()).into());
    }
    let mut backend = match &config.udid {
        Some(udid) => AxeBackend::new(udid.clone()),
        None => AxeBackend::booted()?,
    };
    backend.connect().await?;
    info!(udid = %backend.udid(), "connected to simulator");
    Ok(Arc::new(backend))
}

fn select_scenarios(names: &[String]) -> Result<Vec<Box<dyn Scenario>>, CliError> {
    if names.is_empty() {
        return Ok(scenarios::all());
    }
    names
        .iter()
        .map(|name| {
            scenarios::find(name).ok_or_else(|| {
                CliError::Usage(format!("unknown scenario '{}' (see `findmy-ui list`)", name))
            })
        })
        .collect()
}

/// Runs `selected` back to back on one context. Stops early on an
/// environment failure or Ctrl-C.
async fn run_scenarios(
    ctx: &mut TestContext,
    selected: &[Box<dyn Scenario>],
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let mut failed = Vec::new();
    for scenario in selected {
        let outcome: ScenarioOutcome = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(scenario = scenario.name(), "interrupted");
                return Err(CliError::Interrupted);
            }
            outcome = scenarios::run(scenario.as_ref(), ctx) => outcome,
        };
        print_outcome(&outcome);
        if let Err(e) = outcome.result {
            if e.is_environment() {
                return Err(CliError::Environment(format!("{}: {}", outcome.name, e)));
            }
            failed.push(outcome.name);
        }
    }

    println!();
    println!("{} passed, {} failed", selected.len() - failed.len(), failed.len());
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Failed(failed.join(", ")))
    }
}

fn print_outcome(outcome: &ScenarioOutcome) {
    let elapsed = format!("{:.1}s", outcome.elapsed.as_secs_f64());
    match &outcome.result {
        Ok(()) => println!("PASS  {:<26} {}", outcome.name, elapsed),
        Err(e) => {
            println!("FAIL  {:<26} {}", outcome.name, elapsed);
            println!("      {}", describe_failure(e));
        }
    }
}

fn describe_failure(e: &NavigationError) -> String {
    match e {
        NavigationError::ElementMissing { .. } => format!("missing element: {}", e),
        NavigationError::Ui(inner) => inner.to_string(),
    }
}

async fn write_report(ctx: &TestContext, path: &Path) -> Result<(), CliError> {
    ctx.report()
        .export_jsonl(path)
        .await
        .map_err(|e| CliError::Usage(format!("cannot write report {}: {}", path.display(), e)))?;
    eprintln!("Report written to {}", path.display());
    Ok(())
}

fn devices(boot: Option<&str>) -> Result<(), CliError> {
    if let Some(udid) = boot {
        Simctl::boot(udid).map_err(|e| CliError::Environment(format!("Failed to boot device: {}", e)))?;
        eprintln!("Booted device {}", udid);
        return Ok(());
    }
    let devices = Simctl::list_devices()
        .map_err(|e| CliError::Environment(format!("Failed to list devices: {}", e)))?;
    if devices.is_empty() {
        eprintln!("No simulator devices found");
    }
    for device in &devices {
        let state = if device.is_booted() { " (Booted)" } else { "" };
        println!("{} -- {}{}", device.udid, device.name, state);
    }
    Ok(())
}
