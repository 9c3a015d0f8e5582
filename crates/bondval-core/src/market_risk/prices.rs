use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::error::BondvalError;
use crate::types::Money;
use crate::BondvalResult;

const DATE_COLUMN: &str = "Date";
const ADJ_CLOSE_COLUMN: &str = "Adj Close";

/// One row of a daily price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub adjusted_close: Money,
}

/// Source of daily adjusted-close prices for a ticker.
pub trait PriceHistoryProvider {
    /// Prices for `ticker` with `start <= date <= end`, oldest first.
    fn fetch_daily_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BondvalResult<Vec<DailyPrice>>;
}

/// Price histories held in memory, keyed by upper-cased ticker.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceHistory {
    series: HashMap<String, Vec<DailyPrice>>,
}

impl InMemoryPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rows for `ticker`, merging with anything already loaded.
    /// A later row for an existing date replaces the earlier one.
    pub fn insert(&mut self, ticker: &str, rows: impl IntoIterator<Item = DailyPrice>) {
        let entry = self.series.entry(ticker.trim().to_uppercase()).or_default();
        for row in rows {
            match entry.binary_search_by_key(&row.date, |p| p.date) {
                Ok(i) => entry[i] = row,
                Err(i) => entry.insert(i, row),
            }
        }
    }

    /// Parse a provider CSV download and add it under `ticker`.
    pub fn load_csv(&mut self, ticker: &str, text: &str) -> BondvalResult<usize> {
        let rows = parse_price_csv(text)?;
        let count = rows.len();
        self.insert(ticker, rows);
        debug!(ticker, rows = count, "loaded price history");
        Ok(count)
    }

    pub fn tickers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl PriceHistoryProvider for InMemoryPriceHistory {
    fn fetch_daily_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BondvalResult<Vec<DailyPrice>> {
        if start > end {
            return Err(BondvalError::InvalidInput {
                field: "start".into(),
                reason: format!("Start date {start} is after end date {end}"),
            });
        }
        let key = ticker.trim().to_uppercase();
        let rows = self
            .series
            .get(&key)
            .ok_or_else(|| BondvalError::InsufficientData(format!("No price history for {key}")))?;
        Ok(rows
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect())
    }
}

/// Parse the provider's CSV download (`Date,Open,High,Low,Close,Adj Close,Volume`),
/// keeping only the date and adjusted close. Rows with a `null` adjusted close
/// (non-trading placeholders) are skipped. Output is sorted by date.
pub fn parse_price_csv(text: &str) -> BondvalResult<Vec<DailyPrice>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| BondvalError::InvalidInput {
                field: "csv".into(),
                reason: format!("Missing '{name}' column"),
            })
    };
    let date_idx = column(DATE_COLUMN)?;
    let close_idx = column(ADJ_CLOSE_COLUMN)?;

    let mut prices = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_close = record.get(close_idx).unwrap_or_default();
        if raw_close.is_empty() || raw_close.eq_ignore_ascii_case("null") {
            continue;
        }
        let date = parse_flexible_date(record.get(date_idx).unwrap_or_default())?;
        let adjusted_close =
            Decimal::from_str(raw_close).map_err(|e| BondvalError::InvalidInput {
                field: ADJ_CLOSE_COLUMN.into(),
                reason: format!("row {}: '{raw_close}' is not a number ({e})", line + 1),
            })?;
        prices.push(DailyPrice {
            date,
            adjusted_close,
        });
    }

    prices.sort_by_key(|p| p.date);
    Ok(prices)
}

/// Parse `YYYY-MM-DD` or `MM/DD/YYYY`. Two-digit years take the current century.
pub fn parse_flexible_date(raw: &str) -> BondvalResult<NaiveDate> {
    let s = raw.trim();
    let bad = || BondvalError::DateError(format!("Unrecognised date '{raw}'"));

    let parts: Vec<&str> = if s.contains('/') {
        s.split('/').collect()
    } else if s.contains('-') {
        s.split('-').collect()
    } else {
        return Err(bad());
    };
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(bad());
    }

    let (y, m, d) = if s.contains('/') {
        (parts[2], parts[0], parts[1])
    } else {
        (parts[0], parts[1], parts[2])
    };

    let month: u32 = m.parse().map_err(|_| bad())?;
    let day: u32 = d.parse().map_err(|_| bad())?;
    let mut year: i32 = y.parse().map_err(|_| bad())?;
    if y.len() <= 2 {
        year += Utc::now().year() / 100 * 100;
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)
}
