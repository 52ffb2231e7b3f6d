use serde::{Deserialize, Serialize};

/// One symbol's OHLCV summary for one trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Epoch seconds, UTC midnight of the trading day.
    pub timestamp: i64,
    #[serde(
        rename = "transactionCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<f64>,
}

impl DailyBar {
    pub fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("ticker is required".to_string());
        }
        if self.timestamp <= 0 {
            return Err(format!("timestamp must be positive: {}", self.timestamp));
        }

        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err("prices must be finite".to_string());
        }
        if prices.iter().any(|p| *p <= 0.0) {
            return Err("prices must be positive".to_string());
        }
        if self.high < self.low {
            return Err(format!(
                "high {} is below low {}",
                self.high, self.low
            ));
        }
        if self.high < self.open.max(self.close) {
            return Err(format!(
                "high {} is below max(open, close) {}",
                self.high,
                self.open.max(self.close)
            ));
        }
        if self.low > self.open.min(self.close) {
            return Err(format!(
                "low {} is above min(open, close) {}",
                self.low,
                self.open.min(self.close)
            ));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(format!("volume cannot be negative: {}", self.volume));
        }
        if let Some(vwap) = self.vwap {
            if !(self.low..=self.high).contains(&vwap) {
                return Err(format!(
                    "vwap {} outside [{}, {}]",
                    vwap, self.low, self.high
                ));
            }
        }
        if self.transaction_count == Some(0) {
            return Err("transactionCount must be positive".to_string());
        }
        Ok(())
    }
}
