//! coral18s: 18S coral metabarcoding analysis driver
//!
//! Runs the classification-agreement parameter sweep against a cache of
//! previously computed results, plots the Mantel parameter sweeps, and builds
//! the release tables of the coral 18S dataset.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cache;
mod config;
mod coordinate;
mod figure;
mod grid;
mod mantel;
mod oracle;
mod seqio;
mod sweep;
mod tables;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::figure::AgreementPanel;
use crate::grid::Exclusions;
use crate::oracle::CommandOracle;
use crate::sweep::SweepScheduler;

/// 18S coral metabarcoding: parameter sweeps, Mantel figures and release tables
#[derive(Parser, Debug)]
#[command(name = "coral18s")]
#[command(version)]
#[command(about = "Cache-aware parameter sweeps and release tables for 18S coral metabarcoding")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the classification agreement sweep and plot one contour per panel
    Sweep(SweepArgs),

    /// Plot the Mantel parameter sweeps found in the output directory
    Mantel(MantelArgs),

    /// Build the meta-info, taxonomy and abundance release tables
    Tables(TablesArgs),
}

/// Arguments for the sweep subcommand
#[derive(Parser, Debug)]
struct SweepArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Concurrent oracle invocations (overrides sweep.workers)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Arguments for the mantel subcommand
#[derive(Parser, Debug)]
struct MantelArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Arguments for the tables subcommand
#[derive(Parser, Debug)]
struct TablesArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Number of threads
    #[arg(short, long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn load_config(path: &Path) -> Result<Config> {
    info!("Loading configuration: {}", path.display());
    Config::from_yaml(path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sweep(args) => run_sweep(args),
        Commands::Mantel(args) => run_mantel(args),
        Commands::Tables(args) => run_tables(args),
    }
}

/// Run every configured sweep panel, then render the agreement figure
fn run_sweep(args: SweepArgs) -> Result<()> {
    init_logging(args.verbose);
    info!("coral18s sweep v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    let sweep_config = config.sweep()?;
    let oracle_config = config.oracle()?;
    let workers = args.workers.unwrap_or(sweep_config.workers);

    let oracle = Arc::new(CommandOracle::new(
        &oracle_config.program,
        oracle_config.args.clone(),
    ));
    let exclusions = Exclusions::new(sweep_config.excluded_cutoffs.iter().copied());
    let scheduler = SweepScheduler::new(ResultCache::new(&config.paths.output_dir), oracle, workers)
        .with_exclusions(exclusions)
        .with_cache_dir(config.paths.cache_dir());

    let panels = sweep_config.panels();
    info!("Using {} workers for {} sweep panels", scheduler.worker_count(), panels.len());

    let mut figure_panels = Vec::with_capacity(panels.len());
    for panel in panels {
        let title = panel.title();
        info!("Sweeping {} ({} coordinates)", title, panel.coordinates.len());
        let outcome = scheduler
            .run(panel.coordinates)
            .with_context(|| format!("Sweep failed for {}", title))?;

        match &outcome.best {
            Some(best) => info!(
                "  Best for {}: agreement {:.4} at threshold {}, cutoff {} ({})",
                title, best.metric, best.x, best.y, best.label
            ),
            None => warn!("  No results for {}", title),
        }

        figure_panels.push(AgreementPanel {
            title,
            grid: outcome.grid,
        });
    }

    let figure_dir = config.paths.figure_dir();
    std::fs::create_dir_all(&figure_dir)
        .with_context(|| format!("Failed to create {}", figure_dir.display()))?;
    let path = figure_dir.join("classification_agreement.png");
    figure::render_agreement_figure(&path, &figure_panels)?;

    Ok(())
}

/// Scan Mantel results and render the three-row figure
fn run_mantel(args: MantelArgs) -> Result<()> {
    init_logging(args.verbose);
    info!("coral18s mantel v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    let entries = mantel::scan_mantel_results(&config.paths.output_dir)?;
    if entries.is_empty() {
        bail!(
            "No Mantel results found in {}",
            config.paths.output_dir.display()
        );
    }
    let layout = mantel::MantelLayout::build(&entries, &config.mantel)?;
    info!("Mantel figure: {} panels", layout.panel_count());

    let figure_dir = config.paths.figure_dir();
    std::fs::create_dir_all(&figure_dir)
        .with_context(|| format!("Failed to create {}", figure_dir.display()))?;
    let path = figure_dir.join("mantel_three_row.png");
    figure::render_mantel_figure(&path, &layout)?;

    Ok(())
}

/// Build and write the release tables
fn run_tables(args: TablesArgs) -> Result<()> {
    let start_time = std::time::Instant::now();
    init_logging(args.verbose);

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    info!("coral18s tables v{}", env!("CARGO_PKG_VERSION"));
    info!("Using {} threads", args.threads);

    let config = load_config(&args.config)?;
    let qc_dir = config.paths.qc_dir()?;
    let release = tables::build_release_tables(&config.paths.cache_dir(), qc_dir)?;

    let stamp = tables::release_timestamp(chrono::Utc::now());
    let written = tables::write_release_tables(&release, &config.paths.tables_dir(), &stamp)?;

    info!(
        "Wrote {} tables in {:.1}s",
        written.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
