use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use vercheck::check::notifier::Notifier;
use vercheck::check::orchestrator::{Orchestrator, RunOptions, RunReport};
use vercheck::config::{DEFAULT_FETCH_TIMEOUT_MS, load_config};
use vercheck::logging::{self, DEFAULT_LOG_LEVEL, LogFormat};
use vercheck::version::dispatch::{Dispatcher, FetcherRegistry};
use vercheck::version::fetchers::build_client;

#[derive(Parser)]
#[command(name = "vercheck")]
#[command(version, about = "Check upstream sources for new software versions")]
struct Cli {
    /// Target configuration files, merged in order
    files: Vec<PathBuf>,

    /// Show a desktop notification for every update
    #[arg(long)]
    notify: bool,

    /// Previously recorded versions
    #[arg(long, value_name = "FILE")]
    oldverfile: Option<PathBuf>,

    /// Where to write the new version table
    #[arg(long, value_name = "FILE")]
    verfile: Option<PathBuf>,

    /// Per-lookup timeout in seconds, 0 disables it
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_MS / 1000)]
    timeout: u64,

    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(&cli.log_level, cli.log_format, cli.log_file.as_deref())?;

    if cli.files.is_empty() {
        info!("No configuration files given, nothing to check");
        return Ok(());
    }

    let report = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))?;

    info!(
        "Checked {} targets: {} updated, {} failed",
        report.checked,
        report.updates.len(),
        report.failed.len()
    );
    if !report.failed.is_empty() {
        warn!("Failed targets: {}", report.failed.join(", "));
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<RunReport> {
    let config = load_config(&cli.files)?;
    let client = build_client().context("Failed to build HTTP client")?;
    let timeout = (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout));
    let orchestrator = Orchestrator::new(Dispatcher::new(
        FetcherRegistry::with_defaults(client),
        timeout,
    ));

    let notify = cli.notify || config.global.notify.unwrap_or(false);
    let options = RunOptions {
        oldver: cli.oldverfile.or(config.global.oldver),
        newver: cli.verfile.or(config.global.newver),
        notifier: notify.then(Notifier::desktop),
    };

    Ok(orchestrator.run(&config.targets, options).await?)
}
