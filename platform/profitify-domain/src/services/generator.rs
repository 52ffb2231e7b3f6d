//! Synthetic daily-bar generation.
//!
//! A [`SeriesSpec`] describes one symbol's series; [`SeriesSpec::bars`] hands
//! out a fresh lazy iterator each time it is called, so the same spec always
//! replays the same sequence.

use crate::services::calendar::{next_trading_day, utc_midnight_epoch};
use crate::value_objects::daily_bar::DailyBar;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_CLOSE: f64 = 1.0;

const DAILY_CHANGE_SPAN: f64 = 0.05;
const TREND_MAX: f64 = 0.02;
const VOLATILITY_MAX: f64 = 0.03;
const OPEN_JITTER: f64 = 0.01;
const WICK_MAX: f64 = 0.03;
const BASE_VOLUME_MIN: u64 = 1_000_000;
const BASE_VOLUME_MAX: u64 = 10_000_000;
const VOLUME_CHANGE_SCALE: f64 = 10.0;
const TRANSACTIONS_MIN: u32 = 10_000;
const TRANSACTIONS_MAX: u32 = 100_000;
const OTC_PROBABILITY: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub symbol: String,
    pub base_price: f64,
    pub trading_days: usize,
    pub start_date: NaiveDate,
    pub seed: u64,
}

impl SeriesSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("series symbol is empty".to_string());
        }
        if !self.base_price.is_finite() || self.base_price <= 0.0 {
            return Err(format!(
                "{}: base price must be positive (got {})",
                self.symbol, self.base_price
            ));
        }
        Ok(())
    }

    pub fn bars(&self) -> DailyBarGenerator {
        DailyBarGenerator {
            symbol: self.symbol.clone(),
            previous_close: self.base_price,
            remaining: self.trading_days,
            date: self.start_date,
            rng: StdRng::seed_from_u64(self.seed),
        }
    }
}

/// Lazy, finite stream of one symbol's bars, one per weekday.
#[derive(Debug, Clone)]
pub struct DailyBarGenerator {
    symbol: String,
    previous_close: f64,
    remaining: usize,
    date: NaiveDate,
    rng: StdRng,
}

impl Iterator for DailyBarGenerator {
    type Item = DailyBar;

    fn next(&mut self) -> Option<DailyBar> {
        if self.remaining == 0 {
            return None;
        }

        let date = next_trading_day(self.date);
        let bar = next_bar(
            &self.symbol,
            utc_midnight_epoch(date),
            self.previous_close,
            &mut self.rng,
        );

        self.previous_close = bar.close;
        self.date = date + Duration::days(1);
        self.remaining -= 1;
        Some(bar)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for DailyBarGenerator {}

/// One step of the price walk starting from `previous_close`.
pub fn next_bar<R: Rng + ?Sized>(
    symbol: &str,
    timestamp: i64,
    previous_close: f64,
    rng: &mut R,
) -> DailyBar {
    let daily_change = rng.gen_range(-DAILY_CHANGE_SPAN..DAILY_CHANGE_SPAN);
    let trend = rng.gen_range(0.0..TREND_MAX);
    let volatility = rng.gen_range(0.0..VOLATILITY_MAX);
    let change = daily_change + trend + volatility;

    let close = (previous_close * (1.0 + change)).max(MIN_CLOSE);
    let open = previous_close * (1.0 + rng.gen_range(-OPEN_JITTER..OPEN_JITTER));
    let high = open.max(close) * (1.0 + rng.gen_range(0.0..WICK_MAX));
    let low = open.min(close) * (1.0 - rng.gen_range(0.0..WICK_MAX));

    let base_volume = rng.gen_range(BASE_VOLUME_MIN..BASE_VOLUME_MAX) as f64;
    let volume = base_volume * (1.0 + VOLUME_CHANGE_SCALE * change.abs());

    // Mean of four values inside [low, high]; clamp absorbs rounding.
    let vwap = ((open + high + low + close) / 4.0).clamp(low, high);
    let transaction_count = rng.gen_range(TRANSACTIONS_MIN..=TRANSACTIONS_MAX);
    let otc = rng.gen_bool(OTC_PROBABILITY);

    DailyBar {
        ticker: symbol.to_string(),
        open,
        high,
        low,
        close,
        volume,
        timestamp,
        transaction_count: Some(transaction_count),
        otc: Some(otc),
        vwap: Some(vwap),
    }
}

/// Per-symbol seed derived from the run seed (FNV-1a over the symbol).
pub fn symbol_seed(run_seed: u64, symbol: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in symbol.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash ^ run_seed.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}
