use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First weekday on or after `date`.
pub fn next_trading_day(mut date: NaiveDate) -> NaiveDate {
    while !is_trading_day(date) {
        date += Duration::days(1);
    }
    date
}

/// Epoch seconds of UTC midnight on `date`.
pub fn utc_midnight_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date (expected YYYY-MM-DD): {value}"))
}

#[cfg(test)]
mod tests {
    use super::{is_trading_day, next_trading_day, parse_date, utc_midnight_epoch};
    use chrono::NaiveDate;

    #[test]
    fn weekends_are_skipped() {
        // 2024-01-06 is a Saturday.
        let sat = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert!(!is_trading_day(sat));
        assert_eq!(
            next_trading_day(sat),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
        let mon = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(next_trading_day(mon), mon);
    }

    #[test]
    fn midnight_epoch_matches_known_value() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(utc_midnight_epoch(date), 1_767_225_600);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("2024-02-30").is_err());
        assert_eq!(
            parse_date(" 2024-02-29 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }
}
