//! yfdb-ingest - Yahoo Finance to SQLite ingester
//!
//! Scheduled commands (`daily`, `weekly`, `yearly`, `all`) resolve the
//! symbol universe, run their datasets for every symbol and log a summary.
//! Per-symbol failures are reported, not fatal; the process exits non-zero
//! only when setup (config, database, symbol listing) fails.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use yfdb_common::db::open_pool;
use yfdb_ingest::services::YahooClient;
use yfdb_ingest::{
    resolve_symbols, sample, Database, Dataset, IngestConfig, IngestRunner, Ingestor, Schedule,
    SymbolSource,
};

#[derive(Parser)]
#[command(name = "yfdb-ingest")]
#[command(about = "Ingest Yahoo Finance data for Japanese equities into SQLite")]
#[command(version)]
struct Cli {
    /// Config file (default: $YFDB_CONFIG, then the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database URL, overriding config and DATABASE_URL
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Default)]
struct SymbolArgs {
    /// Comma separated codes or tickers instead of the J-Quants listing
    #[arg(long, value_delimiter = ',', conflicts_with = "symbols_file")]
    symbols: Vec<String>,

    /// File with one code per line
    #[arg(long, value_name = "FILE")]
    symbols_file: Option<PathBuf>,

    /// Process at most this many symbols
    #[arg(long)]
    limit: Option<usize>,
}

impl SymbolArgs {
    fn source(&self) -> SymbolSource {
        if let Some(path) = &self.symbols_file {
            SymbolSource::File(path.clone())
        } else if !self.symbols.is_empty() {
            SymbolSource::List(self.symbols.clone())
        } else {
            SymbolSource::JQuants
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Profile and price history
    Daily(SymbolArgs),
    /// Events, estimates, holders and news
    Weekly(SymbolArgs),
    /// Financial statements and sustainability
    Yearly(SymbolArgs),
    /// Every dataset
    All(SymbolArgs),
    /// Selected datasets
    Run {
        /// Dataset names, e.g. `--dataset history --dataset news`
        #[arg(long = "dataset", short = 'd', required = true, value_delimiter = ',')]
        datasets: Vec<Dataset>,

        #[command(flatten)]
        symbols: SymbolArgs,
    },
    /// Print the resolved symbol list
    Symbols(SymbolArgs),
    /// Save raw Yahoo responses for one symbol as JSON
    Sample {
        symbol: String,

        /// Output directory
        #[arg(long, default_value = "./sample")]
        out: PathBuf,

        /// Limit to these datasets
        #[arg(long = "dataset", short = 'd', value_delimiter = ',')]
        datasets: Vec<Dataset>,
    },
    /// Create or update every table
    InitDb,
    /// Drop every table
    DropDb {
        /// Confirm the drop
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = IngestConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }

    init_tracing(&config);

    info!(
        "Starting yfdb-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config.source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using built-in defaults"),
    }

    match cli.command {
        Command::Daily(args) => run_schedule(&config, Schedule::Daily.datasets(), &args).await,
        Command::Weekly(args) => run_schedule(&config, Schedule::Weekly.datasets(), &args).await,
        Command::Yearly(args) => run_schedule(&config, Schedule::Yearly.datasets(), &args).await,
        Command::All(args) => run_schedule(&config, Schedule::All.datasets(), &args).await,
        Command::Run { datasets, symbols } => run_schedule(&config, &datasets, &symbols).await,
        Command::Symbols(args) => {
            let tickers = resolve_symbols(&args.source(), &config, args.limit).await?;
            for ticker in tickers {
                println!("{}", ticker);
            }
            Ok(())
        }
        Command::Sample { symbol, out, datasets } => {
            let yahoo = YahooClient::new(&config.yahoo)?;
            let datasets = if datasets.is_empty() {
                Dataset::ALL.to_vec()
            } else {
                datasets
            };
            let written = sample::write_samples(&yahoo, &symbol, &datasets, &out).await?;
            info!("Wrote {} sample files to {}", written.len(), out.display());
            Ok(())
        }
        Command::InitDb => {
            let db = Database::open(&config.database).await?;
            db.create_tables().await?;
            Ok(())
        }
        Command::DropDb { yes } => {
            if !yes {
                bail!("Refusing to drop tables without --yes");
            }
            let pool = open_pool(&config.database).await?;
            Database::from_pool(pool, config.database.max_lock_wait_ms)
                .drop_tables()
                .await?;
            Ok(())
        }
    }
}

/// Config level as the default directive; RUST_LOG, when set, wins
fn init_tracing(config: &IngestConfig) {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    if config.database.echo {
        if let Ok(directive) = "sqlx::query=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_schedule(config: &IngestConfig, datasets: &[Dataset], args: &SymbolArgs) -> Result<()> {
    let db = Database::open(&config.database)
        .await
        .context("Failed to open database")?;
    let yahoo = Arc::new(YahooClient::new(&config.yahoo)?);

    let symbols = resolve_symbols(&args.source(), config, args.limit)
        .await
        .context("Failed to resolve symbols")?;

    let runner = IngestRunner::new(Ingestor::new(yahoo, db), &config.runner);
    let report = runner.run(&symbols, datasets).await;
    report.log();
    Ok(())
}
