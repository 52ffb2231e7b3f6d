use chrono::NaiveDate;
use profitify_domain::repositories::item_store::{marshal_item, TableSpec};
use profitify_domain::services::generator::SeriesSpec;
use proptest::prelude::*;

fn spec(seed: u64, base_price: f64, days: usize, start_offset: i64) -> SeriesSpec {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(start_offset);
    SeriesSpec {
        symbol: "PROP".to_string(),
        base_price,
        trading_days: days,
        start_date: start,
        seed,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn generated_bars_hold_price_invariants(
        seed in any::<u64>(),
        base_price in 0.5f64..5_000.0,
        days in 1usize..300,
        start_offset in 0i64..2_000,
    ) {
        for bar in spec(seed, base_price, days, start_offset).bars() {
            prop_assert!(bar.high >= bar.open.max(bar.close));
            prop_assert!(bar.low <= bar.open.min(bar.close));
            prop_assert!(bar.high >= bar.low);
            prop_assert!(bar.open > 0.0 && bar.high > 0.0 && bar.low > 0.0 && bar.close > 0.0);
            prop_assert!(bar.close >= 1.0);
            prop_assert!(bar.volume >= 0.0);
            let vwap = bar.vwap.expect("generator always sets vwap");
            prop_assert!(vwap >= bar.low && vwap <= bar.high);
            let tx = bar.transaction_count.expect("generator always sets transactionCount");
            prop_assert!((10_000..=100_000).contains(&tx));
            prop_assert!(bar.validate().is_ok());
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed(seed in any::<u64>(), days in 0usize..120) {
        let s = spec(seed, 100.0, days, 0);
        let first: Vec<_> = s.bars().collect();
        let second: Vec<_> = s.bars().collect();
        prop_assert_eq!(first.len(), days);
        prop_assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn generated_bars_always_marshal(seed in any::<u64>(), days in 1usize..60) {
        let table = TableSpec::daily_bars("daily_summary");
        for bar in spec(seed, 42.0, days, 3).bars() {
            prop_assert!(marshal_item(&bar, &table).is_ok());
        }
    }
}
