use clap::{Parser, ValueEnum};
use profitify_application::config::{Provisioning, StoreBackend};
use profitify_seed::{obs, Overrides, EXIT_SETUP_ERROR};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "profitify-seed")]
#[command(
    about = "Seed the store with reference tickers and synthetic daily bars.",
    version
)]
#[command(
    after_help = "Examples:\n  profitify-seed --store memory --symbols AAPL,KO --trading-days 20\n  PROFITIFY_DB_URL=postgres://localhost/profitify profitify-seed --provisioning recreate\n"
)]
struct Cli {
    /// Config file path (TOML).
    #[arg(long, env = "PROFITIFY_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    store: Option<StoreArg>,

    /// Postgres connection URL (postgres backend only).
    #[arg(long, env = "PROFITIFY_DB_URL", hide_env_values = true)]
    db_url: Option<String>,

    #[arg(long)]
    workers: Option<usize>,

    /// Items per bulk write (1..=25).
    #[arg(long)]
    batch_size: Option<usize>,

    /// Channel capacity (default: batch size x workers).
    #[arg(long)]
    channel_capacity: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    trading_days: Option<usize>,

    /// First calendar day of the series (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<String>,

    /// Comma-separated subset of the reference tickers.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    #[arg(long, value_enum)]
    provisioning: Option<ProvisioningArg>,

    #[arg(long)]
    max_attempts: Option<u32>,

    #[arg(long)]
    base_delay_ms: Option<u64>,

    /// Exit with status 2 if any batch was dropped.
    #[arg(long)]
    fail_on_dropped: bool,

    /// Log filter used when PROFITIFY_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// text | json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Prometheus listener address (host:port).
    #[arg(long, env = "PROFITIFY_METRICS_ADDR")]
    metrics_addr: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StoreArg {
    Postgres,
    Memory,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ProvisioningArg {
    Ensure,
    Recreate,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            store: self.store.map(|s| match s {
                StoreArg::Postgres => StoreBackend::Postgres,
                StoreArg::Memory => StoreBackend::Memory,
            }),
            db_url: self.db_url.clone(),
            workers: self.workers,
            batch_size: self.batch_size,
            channel_capacity: self.channel_capacity,
            seed: self.seed,
            trading_days: self.trading_days,
            start_date: self.start_date.clone(),
            symbols: self
                .symbols
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            provisioning: self.provisioning.map(|p| match p {
                ProvisioningArg::Ensure => Provisioning::Ensure,
                ProvisioningArg::Recreate => Provisioning::Recreate,
            }),
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            fail_on_dropped: self.fail_on_dropped,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {err}");
        std::process::exit(EXIT_SETUP_ERROR);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(EXIT_SETUP_ERROR);
    }

    match run(&cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(EXIT_SETUP_ERROR);
        }
    }
}

async fn run(cli: &Cli) -> Result<i32, String> {
    let config = profitify_seed::resolve_config(cli.config.as_deref(), &cli.overrides())?;
    let outcome = profitify_seed::run_seed(&config).await?;
    println!("{}", profitify_seed::render_summary(&outcome));
    Ok(outcome.exit_code())
}
