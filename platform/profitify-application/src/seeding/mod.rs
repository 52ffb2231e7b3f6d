//! Seeding use case: provision both tables, load the reference tickers, then
//! stream every symbol's synthetic bars through the pipeline.

use crate::config::{Config, Provisioning};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineReport};
use chrono::{Months, NaiveDate};
use profitify_domain::entities::ticker::TickerRecord;
use profitify_domain::repositories::item_store::{
    validate_identifier, ItemStore, StoreError, TableSpec,
};
use profitify_domain::services::calendar::parse_date;
use profitify_domain::services::generator::{symbol_seed, SeriesSpec};
use profitify_domain::services::reference::{select_tickers, ReferenceTicker};
use profitify_domain::value_objects::daily_bar::DailyBar;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{Instrument, Span};

const DEFAULT_HISTORY_MONTHS: u32 = 60;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed plan: {0}")]
    Plan(String),
    #[error("failed to provision table {table}: {source}")]
    Provisioning { table: String, source: StoreError },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Everything needed to seed, resolved once at setup.
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub tickers_table: TableSpec,
    pub bars_table: TableSpec,
    pub provisioning: Provisioning,
    pub tickers: Vec<&'static ReferenceTicker>,
    pub start_date: NaiveDate,
    pub trading_days: usize,
    pub seed: u64,
    /// Stamped into every ticker's `lastUpdatedUTC`.
    pub reference_timestamp: i64,
}

impl SeedPlan {
    pub fn from_config(config: &Config, today: NaiveDate, now_utc: i64) -> Result<Self, SeedError> {
        validate_identifier(&config.store.tickers_table).map_err(SeedError::Plan)?;
        validate_identifier(&config.store.bars_table).map_err(SeedError::Plan)?;
        let tickers = select_tickers(&config.generator.symbols).map_err(SeedError::Plan)?;
        let start_date = match config.generator.start_date.as_deref() {
            Some(raw) => parse_date(raw).map_err(SeedError::Plan)?,
            None => default_start_date(today),
        };

        let plan = Self {
            tickers_table: TableSpec::tickers(&config.store.tickers_table),
            bars_table: TableSpec::daily_bars(&config.store.bars_table),
            provisioning: config.store.provisioning,
            tickers,
            start_date,
            trading_days: config.generator.trading_days,
            seed: config.generator.seed,
            reference_timestamp: now_utc.max(0),
        };
        for series in plan.series() {
            series.validate().map_err(SeedError::Plan)?;
        }
        Ok(plan)
    }

    pub fn ticker_records(&self) -> Vec<TickerRecord> {
        self.tickers
            .iter()
            .map(|t| t.to_record(self.reference_timestamp))
            .collect()
    }

    pub fn series(&self) -> Vec<SeriesSpec> {
        self.tickers
            .iter()
            .map(|t| SeriesSpec {
                symbol: t.symbol.to_string(),
                base_price: t.base_price,
                trading_days: self.trading_days,
                start_date: self.start_date,
                seed: symbol_seed(self.seed, t.symbol),
            })
            .collect()
    }

    /// Lazily chains every symbol's series, one symbol after another.
    pub fn bars(&self) -> impl Iterator<Item = DailyBar> {
        self.series().into_iter().flat_map(|series| {
            tracing::debug!(
                symbol = %series.symbol,
                trading_days = series.trading_days,
                base_price = series.base_price,
                "generating series"
            );
            series.bars()
        })
    }

    pub fn expected_bars(&self) -> usize {
        self.tickers.len().saturating_mul(self.trading_days)
    }
}

pub fn default_start_date(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(DEFAULT_HISTORY_MONTHS))
        .unwrap_or(today)
}

#[derive(Debug, Clone)]
pub struct SeedReport {
    pub tickers: PipelineReport,
    pub bars: PipelineReport,
    pub elapsed: Duration,
}

impl SeedReport {
    pub fn items_written(&self) -> u64 {
        self.tickers.progress.items_written() + self.bars.progress.items_written()
    }

    pub fn items_dropped(&self) -> u64 {
        self.tickers.progress.counters.items_dropped + self.bars.progress.counters.items_dropped
    }

    pub fn has_drops(&self) -> bool {
        self.tickers.progress.has_drops() || self.bars.progress.has_drops()
    }

    pub fn tables(&self) -> [&PipelineReport; 2] {
        [&self.tickers, &self.bars]
    }
}

pub async fn provision_table(
    store: &dyn ItemStore,
    spec: &TableSpec,
    provisioning: Provisioning,
) -> Result<(), SeedError> {
    let wrap = |source: StoreError| SeedError::Provisioning {
        table: spec.name.clone(),
        source,
    };
    let exists = store.table_exists(&spec.name).await.map_err(wrap)?;
    match (provisioning, exists) {
        (Provisioning::Ensure, true) => {
            tracing::info!(table = %spec.name, "table exists, keeping it");
            return Ok(());
        }
        (Provisioning::Recreate, true) => {
            store.delete_table(&spec.name).await.map_err(wrap)?;
            tracing::info!(table = %spec.name, "table deleted");
        }
        (_, false) => {}
    }
    store.create_table(spec).await.map_err(wrap)?;
    tracing::info!(
        table = %spec.name,
        provisioning = provisioning.as_str(),
        "table created"
    );
    Ok(())
}

pub struct Seeder {
    store: Arc<dyn ItemStore>,
    pipeline: PipelineConfig,
    retry: RetryPolicy,
    span: Span,
}

impl Seeder {
    pub fn new(store: Arc<dyn ItemStore>, pipeline: PipelineConfig, retry: RetryPolicy) -> Self {
        Self {
            store,
            pipeline,
            retry,
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Provisions both tables, then runs the ticker and bar pipelines one
    /// after another. Only setup failures are returned as errors.
    pub async fn run(&self, plan: &SeedPlan) -> Result<SeedReport, SeedError> {
        let span = tracing::info_span!(
            parent: &self.span,
            "seed.run",
            symbols = plan.tickers.len(),
            trading_days = plan.trading_days,
            seed = plan.seed
        );
        self.run_inner(plan).instrument(span).await
    }

    async fn run_inner(&self, plan: &SeedPlan) -> Result<SeedReport, SeedError> {
        let started = Instant::now();
        self.pipeline.validate()?;

        provision_table(self.store.as_ref(), &plan.tickers_table, plan.provisioning).await?;
        provision_table(self.store.as_ref(), &plan.bars_table, plan.provisioning).await?;

        let pipeline = Pipeline::new(
            Arc::clone(&self.store),
            self.pipeline.clone(),
            self.retry.clone(),
        )?
        .with_span(Span::current());

        tracing::info!(
            table = %plan.tickers_table.name,
            items = plan.tickers.len(),
            "seeding tickers"
        );
        let tickers = pipeline
            .run(&plan.tickers_table, plan.ticker_records())
            .await?;

        tracing::info!(
            table = %plan.bars_table.name,
            items = plan.expected_bars(),
            start_date = %plan.start_date,
            "seeding daily bars"
        );
        let bars = pipeline.run(&plan.bars_table, plan.bars()).await?;

        Ok(SeedReport {
            tickers,
            bars,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{default_start_date, SeedError, SeedPlan};
    use crate::config::Config;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("date")
    }

    #[test]
    fn default_start_is_five_years_back() {
        assert_eq!(
            default_start_date(today()),
            NaiveDate::from_ymd_opt(2019, 3, 15).expect("date")
        );
    }

    #[test]
    fn plan_covers_every_reference_ticker_by_default() {
        let mut config = Config::default();
        config.generator.trading_days = 3;
        let plan = SeedPlan::from_config(&config, today(), 1_700_000_000).expect("plan");

        assert_eq!(plan.tickers.len(), 15);
        assert_eq!(plan.expected_bars(), 45);
        assert_eq!(plan.bars().count(), 45);
        assert!(plan
            .ticker_records()
            .iter()
            .all(|t| t.last_updated_utc == 1_700_000_000 && t.validate().is_ok()));
    }

    #[test]
    fn symbol_series_do_not_depend_on_the_selection() {
        let mut config = Config::default();
        config.generator.trading_days = 5;
        config.generator.start_date = Some("2024-01-01".to_string());
        config.generator.symbols = vec!["KO".to_string()];
        let alone = SeedPlan::from_config(&config, today(), 0).expect("plan");

        config.generator.symbols = vec!["AAPL".to_string(), "KO".to_string()];
        let paired = SeedPlan::from_config(&config, today(), 0).expect("plan");

        let ko_alone: Vec<_> = alone.bars().collect();
        let ko_paired: Vec<_> = paired.bars().filter(|b| b.ticker == "KO").collect();
        assert_eq!(ko_alone, ko_paired);
    }

    #[test]
    fn plan_rejects_unknown_symbols_and_bad_tables() {
        let mut config = Config::default();
        config.generator.symbols = vec!["NOPE".to_string()];
        assert!(matches!(
            SeedPlan::from_config(&config, today(), 0),
            Err(SeedError::Plan(_))
        ));

        let mut config = Config::default();
        config.store.bars_table = "daily summary; drop".to_string();
        assert!(SeedPlan::from_config(&config, today(), 0).is_err());
    }
}
