//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use mapsweep_core::pipeline::{
    Collaborators, ProgressReporter, SweepConfig, SweepSummary, run_sweep,
};
use mapsweep_provider::ProviderOptions;
use mapsweep_shared::{
    AppConfig, DistanceUnit, ExploreConfig, LatLng, ResultSink, SearchRegion, init_config,
    load_config,
};
use mapsweep_storage::{JsonFileSink, Storage};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// MapSweep: exhaustive business discovery over a map area.
#[derive(Parser)]
#[command(
    name = "mapsweep",
    version,
    about = "Find every business of a category inside a map area by adaptive subdivision.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sweep an area for businesses of one category.
    Search(SearchArgs),

    /// List businesses stored by previous sweeps.
    List {
        /// Database path (defaults to `output.db_path`).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Maximum rows to print.
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `mapsweep search`. Unset options fall back to the config file.
#[derive(clap::Args, Debug)]
pub(crate) struct SearchArgs {
    /// Business category, e.g. "factories".
    pub category: String,

    /// Latitude of the area center.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the area center.
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Radius of the area.
    #[arg(long)]
    pub radius: f64,

    /// Radius unit: km or m.
    #[arg(long, default_value = "km")]
    pub unit: DistanceUnit,

    /// Maximum subdivision depth.
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Child regions per subdivision.
    #[arg(long)]
    pub fanout: Option<u32>,

    /// Result count at which a region counts as saturated.
    #[arg(long)]
    pub page_cap: Option<usize>,

    /// Regions searched in parallel.
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Database path (defaults to `output.db_path`).
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Also merge results into this JSON file.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mapsweep=info",
        1 => "mapsweep=debug",
        _ => "mapsweep=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Search(args) => cmd_search(args).await,
        Command::List { db, limit } => cmd_list(db, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

/// Merge CLI overrides into the file configuration.
fn build_sweep_config(args: &SearchArgs, config: &AppConfig) -> SweepConfig {
    let mut explore = ExploreConfig::from(config);
    if let Some(max_depth) = args.max_depth {
        explore.max_depth = max_depth;
    }
    if let Some(fanout) = args.fanout {
        explore.fanout = fanout;
    }
    if let Some(page_cap) = args.page_cap {
        explore.page_cap = page_cap;
    }
    if let Some(concurrency) = args.concurrency {
        explore.concurrency = concurrency;
    }

    SweepConfig::new(
        args.category.trim(),
        LatLng::new(args.lat, args.lng),
        args.radius,
        args.unit,
        explore,
    )
}

async fn cmd_search(args: SearchArgs) -> Result<()> {
    let mut config = load_config()?;
    if let Some(page_cap) = args.page_cap {
        config.search.page_cap = page_cap;
    }

    let sweep = build_sweep_config(&args, &config);
    // Fail on bad input before touching the database or the sidecar.
    sweep.validate()?;

    let collaborators = Collaborators::http(&ProviderOptions::from(&config))?;

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.db_path));
    let storage = Storage::open(&db_path).await?;
    storage
        .insert_run(&sweep.run_id, &sweep.category, &sweep.initial_region())
        .await?;

    info!(
        run_id = %sweep.run_id,
        category = %sweep.category,
        db = %db_path.display(),
        "starting search"
    );

    let sink = storage.sink(sweep.run_id.clone());
    let progress = CliProgress::new();
    let summary = run_sweep(&sweep, collaborators, &sink, &progress).await?;

    storage
        .finish_run(&summary.run_id, &summary.stats_json())
        .await?;

    let json_path = args.json.clone().or_else(|| {
        let configured = config.output.json_path.trim();
        (!configured.is_empty()).then(|| PathBuf::from(configured))
    });
    let json_outcome = match json_path {
        Some(path) => {
            let json_sink = JsonFileSink::new(path);
            let outcome = json_sink.persist(&summary.records).await?;
            Some((json_sink, outcome))
        }
        None => None,
    };

    print_summary(&sweep, &summary, &db_path);
    if let Some((json_sink, outcome)) = json_outcome {
        println!(
            "  JSON:       {} (+{} new, {} already present)",
            json_sink.path().display(),
            outcome.inserted,
            outcome.skipped
        );
    }
    println!();

    match &summary.persist_error {
        Some(e) => Err(eyre!(
            "{} records were found but not saved to {}: {e}",
            summary.record_count(),
            db_path.display()
        )),
        None => Ok(()),
    }
}

fn print_summary(sweep: &SweepConfig, summary: &SweepSummary, db_path: &std::path::Path) {
    println!();
    println!("  Sweep complete!");
    println!("  Run:        {}", summary.run_id);
    println!("  Area:       {}", sweep.initial_region());
    println!("  Records:    {}", summary.record_count());
    match &summary.persist_error {
        Some(e) => println!("  Saved:      FAILED ({}): {e}", db_path.display()),
        None => println!(
            "  Saved:      {} new, {} already stored ({})",
            summary.persisted.inserted,
            summary.persisted.skipped,
            db_path.display()
        ),
    }
    println!(
        "  Regions:    {} searched, {} subdivided, max depth {}",
        summary.stats.regions_searched,
        summary.stats.regions_subdivided,
        summary.stats.max_depth_reached
    );
    println!(
        "  Queries:    {} searches, {} detail fetches, {} duplicates skipped",
        summary.stats.search_calls, summary.stats.detail_fetches, summary.stats.duplicates_skipped
    );
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());

    if !summary.errors.is_empty() {
        println!("  Errors:     {}", summary.errors.len());
        for (target, message) in &summary.errors {
            warn!(%target, %message, "skipped during sweep");
            println!("    - {target}: {message}");
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn region_searched(&self, region: &SearchRegion, listings: usize, accepted: usize) {
        self.spinner.set_message(format!(
            "Searched {region}: {listings} listings, {accepted} new"
        ));
    }

    fn region_subdivided(&self, region: &SearchRegion, children: usize) {
        self.spinner
            .set_message(format!("Splitting {region} into {children}"));
    }

    fn done(&self, _summary: &SweepSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

async fn cmd_list(db: Option<PathBuf>, limit: usize) -> Result<()> {
    let config = load_config()?;
    let db_path = db.unwrap_or_else(|| PathBuf::from(&config.output.db_path));
    let storage = Storage::open_readonly(&db_path)
        .await
        .map_err(|e| eyre!("cannot open {}: {e}", db_path.display()))?;

    let total = storage.count_businesses().await?;
    let businesses = storage.list_businesses(limit).await?;
    info!(total, shown = businesses.len(), "listing businesses");

    for business in &businesses {
        let record = &business.record;
        let rating = record
            .rating
            .map(|r| format!("{r:.1}"))
            .unwrap_or_else(|| "-".into());
        let reviews = record
            .review_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".into());
        println!("{}  |  {}  |  {rating} ({reviews})", record.name, record.address);
    }
    println!();
    println!("  {} of {total} businesses", businesses.len());

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
