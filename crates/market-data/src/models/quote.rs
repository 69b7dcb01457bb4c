use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{Currency, Symbol};

/// Display format for market times, in the reference timezone.
pub const MARKET_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the quote table.
///
/// Every field except `symbol` is optional: `None` means the provider did not
/// return the symbol at all, omitted the field, or sent something unusable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub symbol: Symbol,

    /// Short name, falling back to the long name
    pub name: Option<String>,

    /// Last regular-market price
    pub price: Option<Decimal>,

    /// Absolute change since previous close
    pub change: Option<Decimal>,

    /// Percentage change since previous close
    pub change_percent: Option<Decimal>,

    /// Market session state (e.g., "REGULAR", "CLOSED", "PRE")
    pub market_state: Option<String>,

    pub volume: Option<u64>,

    pub currency: Option<Currency>,

    /// Time of the last trade, in the reference timezone
    pub market_time: Option<DateTime<FixedOffset>>,
}

impl QuoteRecord {
    /// Placeholder row for a symbol the provider silently dropped.
    pub fn missing(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            price: None,
            change: None,
            change_percent: None,
            market_state: None,
            volume: None,
            currency: None,
            market_time: None,
        }
    }

    pub fn has_price(&self) -> bool {
        self.price.is_some()
    }

    /// Market time rendered for display, e.g. "2024-05-01 15:00:00".
    pub fn market_time_display(&self) -> Option<String> {
        self.market_time
            .map(|t| t.format(MARKET_TIME_FORMAT).to_string())
    }
}

/// Rows with a price versus rows without one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub total: usize,
    pub with_price: usize,
    pub without_price: usize,
}

/// Ordered quote rows, one per requested symbol, sorted by symbol.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteTable(Vec<QuoteRecord>);

impl QuoteTable {
    /// Wrap rows, sorting them by symbol.
    pub fn new(mut rows: Vec<QuoteRecord>) -> Self {
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Self(rows)
    }

    pub fn rows(&self) -> &[QuoteRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&QuoteRecord> {
        self.0
            .binary_search_by(|row| row.symbol.as_str().cmp(symbol))
            .ok()
            .map(|i| &self.0[i])
    }

    pub fn summary(&self) -> QuoteSummary {
        let with_price = self.0.iter().filter(|r| r.has_price()).count();
        QuoteSummary {
            total: self.0.len(),
            with_price,
            without_price: self.0.len() - with_price,
        }
    }
}

/// What the UI boundary renders: the table, its counts and where it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub table: QuoteTable,
    pub summary: QuoteSummary,
    /// When the table was fetched from the provider
    pub fetched_at: DateTime<Utc>,
    /// True when served from the cache without any network call
    pub from_cache: bool,
}

impl QuoteView {
    pub fn new(table: QuoteTable, fetched_at: DateTime<Utc>, from_cache: bool) -> Self {
        let summary = table.summary();
        Self {
            table,
            summary,
            fetched_at,
            from_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn priced(symbol: &str, price: Decimal) -> QuoteRecord {
        QuoteRecord {
            price: Some(price),
            ..QuoteRecord::missing(symbol)
        }
    }

    #[test]
    fn test_missing_row_has_only_symbol() {
        let row = QuoteRecord::missing("9984.T");
        assert_eq!(row.symbol, "9984.T");
        assert!(row.name.is_none());
        assert!(!row.has_price());
        assert!(row.market_time_display().is_none());
    }

    #[test]
    fn test_table_sorts_rows_and_counts_prices() {
        let table = QuoteTable::new(vec![
            priced("AAPL", dec!(189.5)),
            QuoteRecord::missing("9984.T"),
            priced("7203.T", dec!(3120)),
        ]);
        let symbols: Vec<&str> = table.rows().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["7203.T", "9984.T", "AAPL"]);

        let summary = table.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.with_price, 2);
        assert_eq!(summary.without_price, 1);

        assert_eq!(table.get("AAPL").and_then(|r| r.price), Some(dec!(189.5)));
        assert!(table.get("MSFT").is_none());
    }

    #[test]
    fn test_market_time_display() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let row = QuoteRecord {
            market_time: Some(tokyo.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()),
            ..QuoteRecord::missing("7203.T")
        };
        assert_eq!(
            row.market_time_display().as_deref(),
            Some("2024-05-01 15:00:00")
        );
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = QuoteView::new(
            QuoteTable::new(vec![QuoteRecord::missing("AAPL")]),
            Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(),
            true,
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["fromCache"], true);
        assert_eq!(json["summary"]["withoutPrice"], 1);
        assert_eq!(json["table"][0]["symbol"], "AAPL");
        assert!(json["table"][0]["changePercent"].is_null());
    }
}
