use crate::entities::ticker::TickerRecord;

#[derive(Debug, Clone, Copy)]
pub struct ReferenceTicker {
    pub symbol: &'static str,
    pub name: &'static str,
    pub primary_exchange: &'static str,
    pub cik: &'static str,
    pub base_price: f64,
}

pub const REFERENCE_TICKERS: &[ReferenceTicker] = &[
    ReferenceTicker {
        symbol: "AAPL",
        name: "Apple Inc.",
        primary_exchange: "XNAS",
        cik: "0000320193",
        base_price: 175.0,
    },
    ReferenceTicker {
        symbol: "GOOGL",
        name: "Alphabet Inc. Class A",
        primary_exchange: "XNAS",
        cik: "0001652044",
        base_price: 140.0,
    },
    ReferenceTicker {
        symbol: "MSFT",
        name: "Microsoft Corporation",
        primary_exchange: "XNAS",
        cik: "0000789019",
        base_price: 380.0,
    },
    ReferenceTicker {
        symbol: "AMZN",
        name: "Amazon.com Inc.",
        primary_exchange: "XNAS",
        cik: "0001018724",
        base_price: 155.0,
    },
    ReferenceTicker {
        symbol: "TSLA",
        name: "Tesla Inc.",
        primary_exchange: "XNAS",
        cik: "0001318605",
        base_price: 240.0,
    },
    ReferenceTicker {
        symbol: "META",
        name: "Meta Platforms Inc.",
        primary_exchange: "XNAS",
        cik: "0001326801",
        base_price: 485.0,
    },
    ReferenceTicker {
        symbol: "NVDA",
        name: "NVIDIA Corporation",
        primary_exchange: "XNAS",
        cik: "0001045810",
        base_price: 850.0,
    },
    ReferenceTicker {
        symbol: "JPM",
        name: "JPMorgan Chase & Co.",
        primary_exchange: "XNYS",
        cik: "0000019617",
        base_price: 195.0,
    },
    ReferenceTicker {
        symbol: "V",
        name: "Visa Inc.",
        primary_exchange: "XNYS",
        cik: "0001403161",
        base_price: 220.0,
    },
    ReferenceTicker {
        symbol: "WMT",
        name: "Walmart Inc.",
        primary_exchange: "XNYS",
        cik: "0000104169",
        base_price: 150.0,
    },
    ReferenceTicker {
        symbol: "DIS",
        name: "The Walt Disney Company",
        primary_exchange: "XNYS",
        cik: "0001744489",
        base_price: 100.0,
    },
    ReferenceTicker {
        symbol: "NFLX",
        name: "Netflix Inc.",
        primary_exchange: "XNAS",
        cik: "0001065280",
        base_price: 350.0,
    },
    ReferenceTicker {
        symbol: "BA",
        name: "The Boeing Company",
        primary_exchange: "XNYS",
        cik: "0000012927",
        base_price: 200.0,
    },
    ReferenceTicker {
        symbol: "KO",
        name: "The Coca-Cola Company",
        primary_exchange: "XNYS",
        cik: "0000021344",
        base_price: 60.0,
    },
    ReferenceTicker {
        symbol: "PFE",
        name: "Pfizer Inc.",
        primary_exchange: "XNYS",
        cik: "0000078003",
        base_price: 28.0,
    },
];

impl ReferenceTicker {
    pub fn to_record(&self, last_updated_utc: i64) -> TickerRecord {
        TickerRecord {
            ticker: self.symbol.to_string(),
            name: self.name.to_string(),
            market: "stocks".to_string(),
            locale: "us".to_string(),
            primary_exchange: self.primary_exchange.to_string(),
            share_class_figi: None,
            type_code: "CS".to_string(),
            active: 1,
            cik: self.cik.to_string(),
            composite_figi: None,
            currency: "USD".to_string(),
            delisted_utc: 0,
            last_updated_utc,
        }
    }
}

pub fn find_reference(symbol: &str) -> Option<&'static ReferenceTicker> {
    REFERENCE_TICKERS
        .iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol.trim()))
}

/// Resolves a symbol selection against the reference table; empty selects all.
pub fn select_tickers(symbols: &[String]) -> Result<Vec<&'static ReferenceTicker>, String> {
    if symbols.is_empty() {
        return Ok(REFERENCE_TICKERS.iter().collect());
    }
    let mut selected: Vec<&'static ReferenceTicker> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let found = find_reference(symbol)
            .ok_or_else(|| format!("unknown symbol (not in reference table): {symbol}"))?;
        if !selected.iter().any(|t| t.symbol == found.symbol) {
            selected.push(found);
        }
    }
    Ok(selected)
}
