pub mod infra;
pub mod obs;

use chrono::{NaiveDate, Utc};
use profitify_application::config::{self, Config, Provisioning, StoreBackend};
use profitify_application::pipeline::PipelineReport;
use profitify_application::seeding::{SeedPlan, SeedReport, Seeder};
use profitify_domain::repositories::item_store::ItemStore;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

pub const EXIT_OK: i32 = 0;
pub const EXIT_SETUP_ERROR: i32 = 1;
pub const EXIT_DROPPED: i32 = 2;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store: Option<StoreBackend>,
    pub db_url: Option<String>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub channel_capacity: Option<usize>,
    pub seed: Option<u64>,
    pub trading_days: Option<usize>,
    pub start_date: Option<String>,
    pub symbols: Vec<String>,
    pub provisioning: Option<Provisioning>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub fail_on_dropped: bool,
}

pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<Config, String> {
    let mut config = match path {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

pub fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(backend) = overrides.store {
        config.store.backend = backend;
    }
    if let Some(url) = overrides.db_url.as_ref().filter(|v| !v.trim().is_empty()) {
        config.store.url = Some(url.clone());
    }
    if let Some(provisioning) = overrides.provisioning {
        config.store.provisioning = provisioning;
    }
    if let Some(workers) = overrides.workers {
        config.pipeline.workers = workers;
    }
    if let Some(batch_size) = overrides.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(capacity) = overrides.channel_capacity {
        config.pipeline.channel_capacity = Some(capacity);
    }
    if let Some(seed) = overrides.seed {
        config.generator.seed = seed;
    }
    if let Some(days) = overrides.trading_days {
        config.generator.trading_days = days;
    }
    if let Some(start) = overrides.start_date.as_ref() {
        config.generator.start_date = Some(start.clone());
    }
    if !overrides.symbols.is_empty() {
        config.generator.symbols = overrides.symbols.clone();
    }
    if let Some(attempts) = overrides.max_attempts {
        config.retry.max_attempts = attempts;
    }
    if let Some(delay) = overrides.base_delay_ms {
        config.retry.base_delay_ms = delay;
    }
    if overrides.fail_on_dropped {
        config.report.fail_on_dropped = true;
    }
}

#[derive(Debug, Clone)]
pub struct SeedOutcome {
    pub report: SeedReport,
    pub workers: usize,
    pub batch_size: usize,
    pub fail_on_dropped: bool,
}

impl SeedOutcome {
    /// Drops only change the status when explicitly requested.
    pub fn exit_code(&self) -> i32 {
        if self.fail_on_dropped && self.report.has_drops() {
            EXIT_DROPPED
        } else {
            EXIT_OK
        }
    }
}

pub async fn run_seed(config: &Config) -> Result<SeedOutcome, String> {
    let store = infra::build_store(config).await?;
    let now = Utc::now();
    seed_with_store(config, store, now.date_naive(), now.timestamp()).await
}

/// Seeds through an already-built store. `today` anchors the default start
/// date and `now_utc` stamps the ticker records.
pub async fn seed_with_store(
    config: &Config,
    store: Arc<dyn ItemStore>,
    today: NaiveDate,
    now_utc: i64,
) -> Result<SeedOutcome, String> {
    let plan = SeedPlan::from_config(config, today, now_utc).map_err(|err| err.to_string())?;
    let span = tracing::info_span!("seed", backend = config.store.backend.as_str());
    let seeder = Seeder::new(store, config.pipeline_config(), config.retry_policy()).with_span(span);

    let report = seeder.run(&plan).await.map_err(|err| err.to_string())?;
    for table in report.tables() {
        metrics::gauge!("profitify.seed.items_per_second", "table" => table.table.clone())
            .set(table.progress.items_per_second);
    }

    Ok(SeedOutcome {
        report,
        workers: config.pipeline.workers,
        batch_size: config.pipeline.batch_size,
        fail_on_dropped: config.report.fail_on_dropped,
    })
}

pub fn render_summary(outcome: &SeedOutcome) -> String {
    let report = &outcome.report;
    let mut out = String::new();
    let _ = writeln!(out, "Seed summary");
    for table in report.tables() {
        render_table(&mut out, table);
    }

    let elapsed = report.elapsed.as_secs_f64();
    let rate = if elapsed > 0.0 {
        report.items_written() as f64 / elapsed
    } else {
        0.0
    };
    let _ = writeln!(out, "  total items written: {}", report.items_written());
    let _ = writeln!(out, "  total time: {elapsed:.2}s");
    let _ = writeln!(out, "  processing rate: {rate:.2} items/second");
    let _ = writeln!(out, "  workers used: {}", outcome.workers);
    let _ = writeln!(out, "  batch size: {}", outcome.batch_size);
    if report.has_drops() {
        let _ = writeln!(
            out,
            "  warning: {} items were dropped after exhausting retries",
            report.items_dropped()
        );
    }
    let _ = write!(out, "seed complete");
    out
}

fn render_table(out: &mut String, table: &PipelineReport) {
    let c = &table.progress.counters;
    let _ = writeln!(
        out,
        "  {}: {} items written in {} batches, {} items dropped ({} batches), {} marshal errors, {} retries, {:.2} items/second",
        table.table,
        c.items_written,
        c.batches_written,
        c.items_dropped,
        c.batches_dropped,
        c.marshal_errors,
        c.retries,
        table.progress.items_per_second
    );
}
