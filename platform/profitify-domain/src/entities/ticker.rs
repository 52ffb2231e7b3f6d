use serde::{Deserialize, Serialize};

/// Static reference metadata for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub ticker: String,
    pub name: String,
    pub market: String,
    pub locale: String,
    #[serde(rename = "primaryExchange")]
    pub primary_exchange: String,
    #[serde(
        rename = "shareClassFigi",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub share_class_figi: Option<String>,
    #[serde(rename = "type")]
    pub type_code: String,
    pub active: u8,
    pub cik: String,
    #[serde(
        rename = "compositeFigi",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub composite_figi: Option<String>,
    pub currency: String,
    #[serde(rename = "delistedUTC")]
    pub delisted_utc: i64,
    #[serde(rename = "lastUpdatedUTC")]
    pub last_updated_utc: i64,
}

impl TickerRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("ticker is required".to_string());
        }
        if self.name.trim().is_empty() {
            return Err(format!("{}: name is required", self.ticker));
        }
        if self.locale.trim().is_empty() {
            return Err(format!("{}: locale is required", self.ticker));
        }
        if self.active > 1 {
            return Err(format!(
                "{}: active must be 0 or 1 (got {})",
                self.ticker, self.active
            ));
        }
        if self.delisted_utc < 0 || self.last_updated_utc < 0 {
            return Err(format!("{}: timestamps cannot be negative", self.ticker));
        }
        Ok(())
    }
}
