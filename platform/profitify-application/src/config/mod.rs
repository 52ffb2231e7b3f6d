use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::PipelineConfig;
use profitify_domain::repositories::item_store::MAX_BULK_WRITE_ITEMS;
use profitify_domain::services::calendar::parse_date;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

/// How tables are prepared before seeding.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provisioning {
    /// Create only the tables that are missing.
    #[default]
    Ensure,
    /// Delete existing tables, then create them empty.
    Recreate,
}

impl Provisioning {
    pub fn as_str(self) -> &'static str {
        match self {
            Provisioning::Ensure => "ensure",
            Provisioning::Recreate => "recreate",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub store: StoreConfig,
    pub pipeline: PipelineSection,
    pub generator: GeneratorConfig,
    pub retry: RetryConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub bars_table: String,
    pub tickers_table: String,
    pub provisioning: Provisioning,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            bars_table: "daily_summary".to_string(),
            tickers_table: "tickers".to_string(),
            provisioning: Provisioning::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineSection {
    pub workers: usize,
    pub batch_size: usize,
    pub channel_capacity: Option<usize>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            workers: 10,
            batch_size: MAX_BULK_WRITE_ITEMS,
            channel_capacity: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub trading_days: usize,
    /// `YYYY-MM-DD`; defaults to five years before today (UTC).
    pub start_date: Option<String>,
    /// Subset of the reference table; empty seeds every reference ticker.
    pub symbols: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            trading_days: 1300,
            start_date: None,
            symbols: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ReportConfig {
    pub fail_on_dropped: bool,
}

impl Config {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.pipeline.workers,
            batch_size: self.pipeline.batch_size,
            channel_capacity: self.pipeline.channel_capacity,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            self.retry.multiplier,
        )
    }

    /// Setup-time checks that do not need the store.
    pub fn validate(&self) -> Result<(), String> {
        self.pipeline_config()
            .validate()
            .map_err(|err| err.to_string())?;
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be >= 1".to_string());
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(format!(
                "retry.multiplier must be >= 1.0 (got {})",
                self.retry.multiplier
            ));
        }
        if self.store.bars_table == self.store.tickers_table {
            return Err(format!(
                "store.bars_table and store.tickers_table must differ (both {})",
                self.store.bars_table
            ));
        }
        if let Some(start) = self.generator.start_date.as_deref() {
            parse_date(start)?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    parse_config(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str(contents).map_err(|err| err.to_string())
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{load_config, parse_config, to_toml_pretty, Config, Provisioning, StoreBackend};
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").expect("empty config");
        assert_eq!(config, Config::default());
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.bars_table, "daily_summary");
        assert_eq!(config.store.provisioning, Provisioning::Ensure);
        assert_eq!(config.pipeline.workers, 10);
        assert_eq!(config.pipeline_config().capacity(), 250);
        assert_eq!(config.generator.trading_days, 1300);
        assert!(!config.report.fail_on_dropped);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
[store]
backend = "memory"
provisioning = "recreate"

[pipeline]
workers = 2
batch_size = 4

[retry]
base_delay_ms = 0
"#,
        )
        .expect("config should parse");

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.provisioning, Provisioning::Recreate);
        assert_eq!(config.store.tickers_table, "tickers");
        assert_eq!(config.pipeline_config().capacity(), 8);
        let retry = config.retry_policy();
        assert_eq!(retry.attempts(), 3);
        assert_eq!(retry.delay_for(2), Duration::ZERO);
    }

    #[test]
    fn parse_config_rejects_unknown_fields() {
        let err = parse_config("[pipeline]\nthreads = 4\n").expect_err("unknown field");
        assert!(err.contains("unknown field"), "{err}");

        let err = parse_config("[ingest]\n").expect_err("unknown section");
        assert!(!err.is_empty());
    }

    #[test]
    fn parse_config_rejects_malformed_toml() {
        assert!(parse_config("[store\nbackend = 1").is_err());
        assert!(parse_config("[store]\nbackend = \"dynamo\"\n").is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.pipeline.batch_size = 30;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.start_date = Some("2024/01/01".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.store.tickers_table = "daily_summary".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_missing_file_returns_error() {
        let err = load_config(Path::new("/nonexistent/profitify.toml")).expect_err("missing");
        assert!(err.starts_with("failed to read config"), "{err}");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.generator.symbols = vec!["AAPL".to_string(), "KO".to_string()];
        config.generator.start_date = Some("2020-01-02".to_string());
        let rendered = to_toml_pretty(&config).expect("serialize");
        assert_eq!(parse_config(&rendered).expect("reparse"), config);
    }
}
