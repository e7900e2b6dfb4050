use anyhow::{bail, Result};
use clap::Parser;
use omr_scorer::batch::BatchRunner;
use omr_scorer::config::AppConfig;
use omr_scorer::diagnostics::TracingSink;
use omr_scorer::errors::error_logging;
use omr_scorer::observability;
use omr_scorer::reader::SheetReader;
use omr_scorer::sheet_source::collect_sheet_paths;
use omr_scorer::template::Paper;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Score RIASEK answer sheets from scanned or photographed images
#[derive(Parser, Debug)]
#[command(name = "omr-scorer", version)]
#[command(about = "Score OMR answer sheets and print the results as JSON")]
struct Cli {
    /// Answer sheet template: IMK, IKK or IKP
    #[arg(long)]
    paper: Paper,

    /// Sheet image, or a directory of sheet images
    #[arg(long)]
    path: PathBuf,

    /// Sheets processed at the same time (defaults to the CPU count)
    #[arg(long)]
    workers: Option<usize>,

    /// Time budget per sheet in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write intermediate stage images to this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Descend into sub-directories of --path
    #[arg(long)]
    recursive: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if let Some(timeout) = self.timeout_secs {
            config.batch.sheet_timeout_secs = timeout;
        }
        if let Some(dir) = &self.debug_dir {
            config.scanner.debug = true;
            config.scanner.debug_dir = Some(dir.clone());
        }
        if self.recursive {
            config.batch.recursive = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    cli.apply(&mut config);

    let metrics_handle = observability::init_observability(&config.observability)?;

    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "app_config", "startup");
        return Err(e.into());
    }
    info!("{}", config.summary());

    let paths = collect_sheet_paths(&cli.path, config.batch.recursive)?;
    info!(
        paper = %cli.paper,
        path = %cli.path.display(),
        sheets = paths.len(),
        "Collected sheets"
    );

    let reader = Arc::new(SheetReader::new(
        cli.paper,
        config.scanner.clone(),
        Arc::new(TracingSink),
    ));
    if !reader.is_supported() {
        bail!("{} sheets have no image reader", cli.paper);
    }

    let runner = BatchRunner::new(reader, config.batch.clone());
    let report = runner.run(paths).await;

    let results = report.to_json();
    let output = if cli.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", output);

    info!("{}", report.summary());
    if let Some(handle) = metrics_handle {
        debug!(snapshot = %handle.render(), "Metrics snapshot");
    }

    if let Some((path, error)) = report.errors().next() {
        bail!("{} could not be read: {}", path.display(), error);
    }

    Ok(())
}
