//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use listingforge_core::{Pipeline, ProgressReporter};
use listingforge_shared::{
    AppConfig, OptimizationRecord, api_key_present, expand_home, init_config, load_config,
    load_config_from,
};
use listingforge_storage::Storage;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ListingForge: rewrite Amazon listings with generative AI.
#[derive(Parser)]
#[command(
    name = "listingforge",
    version,
    about = "Fetch Amazon product listings, optimize them with Gemini, and keep the history.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.listingforge/listingforge.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding `storage.db_path`.
    #[arg(long, global = true)]
    pub db: Option<String>,

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
    /// Start the HTTP API.
    Serve {
        /// Listen address, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Optimize one listing and store the result.
    Optimize {
        /// Amazon Standard Identification Number (10 chars, A-Z and 0-9).
        asin: String,

        /// Print the stored record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show stored optimizations, newest first.
    History {
        /// Only show records for this ASIN.
        #[arg(long)]
        asin: Option<String>,

        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
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
        0 => "listingforge=info,tower_http=info",
        1 => "listingforge=debug,tower_http=debug",
        _ => "listingforge=trace,tower_http=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Config resolution
// ---------------------------------------------------------------------------

/// Load the config file named on the command line (or the default one) and
/// apply flag overrides.
fn resolve_config(config: Option<&Path>, db: Option<&str>) -> Result<AppConfig> {
    let mut resolved = match config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(db) = db {
        resolved.storage.db_path = db.to_string();
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = || resolve_config(cli.config.as_deref(), cli.db.as_deref());

    match &cli.command {
        Command::Serve { bind } => cmd_serve(config()?, bind.as_deref()).await,
        Command::Optimize { asin, json } => cmd_optimize(config()?, asin, *json).await,
        Command::History { asin, json } => cmd_history(config()?, asin.as_deref(), *json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config()?).await,
        },
    }
}

fn warn_if_no_api_key(config: &AppConfig) {
    if !api_key_present(config) {
        warn!(
            env = %config.gemini.api_key_env,
            "Gemini API key not set; optimization requests will fail"
        );
    }
}

async fn cmd_serve(mut config: AppConfig, bind: Option<&str>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind.to_string();
    }
    warn_if_no_api_key(&config);

    let pipeline = Pipeline::from_config(&config).await?;
    info!(db = %config.storage.db_path, "storage ready");
    listingforge_server::run_server(&config.server.bind, pipeline).await?;
    Ok(())
}

async fn cmd_optimize(config: AppConfig, asin: &str, json: bool) -> Result<()> {
    warn_if_no_api_key(&config);

    let pipeline = Pipeline::from_config(&config).await?;
    let reporter = CliProgress::new();

    let record = match pipeline.optimize(asin, &reporter).await {
        Ok(record) => record,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}

async fn cmd_history(config: AppConfig, asin: Option<&str>, json: bool) -> Result<()> {
    let db_path = expand_home(&config.storage.db_path)?;
    if !db_path.exists() {
        println!("No optimizations yet.");
        return Ok(());
    }

    let storage = Storage::open_readonly(&db_path).await?;
    let records = match asin {
        Some(asin) => storage.get_optimizations_by_asin(&asin.to_uppercase()).await?,
        None => storage.get_all_optimizations().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No optimizations yet.");
        return Ok(());
    }
    for record in &records {
        println!(
            "#{:<5} {}  {}  {}",
            record.id,
            record.asin,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.optimized_title
        );
    }
    Ok(())
}

fn print_record(record: &OptimizationRecord) {
    println!("Optimization #{} for {}", record.id, record.asin);
    println!();
    println!("Original title:  {}", record.original_title);
    println!("Optimized title: {}", record.optimized_title);
    println!();
    println!("Optimized bullets:");
    for (i, bullet) in record.optimized_bullets.iter().enumerate() {
        println!("  {}. {bullet}", i + 1);
    }
    println!();
    println!("Optimized description:");
    println!("  {}", record.optimized_description);
    println!();
    println!("Suggested keywords: {}", record.suggested_keywords.join(", "));
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _record: &OptimizationRecord) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
