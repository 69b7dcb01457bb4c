//! Aligns provider records back onto the requested symbol list.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::{ProviderRecord, QuoteRecord, QuoteTable, SymbolSet};

/// Produce exactly one row per requested symbol, sorted by symbol.
///
/// Provider records for symbols that were not requested are ignored, and
/// only the first record per symbol is used. Requested symbols the provider
/// dropped get a placeholder row with every field but `symbol` absent.
pub fn reconcile(records: Vec<ProviderRecord>, requested: &SymbolSet, tz: Tz) -> QuoteTable {
    let mut seen: HashMap<&str, QuoteRecord> = HashMap::with_capacity(requested.len());

    for record in records {
        let Some(symbol) = record.symbol.as_deref() else {
            warn!("Skipping provider record without a symbol");
            continue;
        };
        let requested_symbols = requested.as_slice();
        let Ok(index) = requested_symbols.binary_search_by(|s| s.as_str().cmp(symbol)) else {
            debug!("Ignoring unrequested symbol '{}' in provider response", symbol);
            continue;
        };
        let key = &requested_symbols[index];
        seen.entry(key.as_str())
            .or_insert_with(|| to_quote_record(key, &record, tz));
    }

    let rows = requested
        .iter()
        .map(|symbol| {
            seen.remove(symbol.as_str())
                .unwrap_or_else(|| QuoteRecord::missing(symbol.clone()))
        })
        .collect();

    QuoteTable::new(rows)
}

/// Map one provider record, dropping fields that don't convert.
fn to_quote_record(symbol: &str, record: &ProviderRecord, tz: Tz) -> QuoteRecord {
    let name = non_blank(record.short_name.as_deref())
        .or_else(|| non_blank(record.long_name.as_deref()))
        .map(str::to_string);

    let market_time = record
        .regular_market_time
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|t| t.with_timezone(&tz).fixed_offset());

    let volume = record
        .regular_market_volume
        .filter(|v| v.is_finite() && *v >= 0.0)
        .and_then(|v| u64::from_f64(v.round()));

    QuoteRecord {
        symbol: symbol.to_string(),
        name,
        price: to_decimal(record.regular_market_price),
        change: to_decimal(record.regular_market_change),
        change_percent: to_decimal(record.regular_market_change_percent),
        market_state: record.market_state.clone(),
        volume,
        currency: record.currency.clone(),
        market_time,
    }
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(Decimal::from_f64)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tokyo() -> Tz {
        chrono_tz::Asia::Tokyo
    }

    #[test]
    fn test_example_with_dropped_symbol() {
        let requested = SymbolSet::from_symbols(["7203.T", "9984.T", "AAPL"]);
        let records = vec![
            ProviderRecord {
                regular_market_price: Some(189.5),
                ..ProviderRecord::for_symbol("AAPL")
            },
            ProviderRecord {
                regular_market_price: Some(3120.0),
                ..ProviderRecord::for_symbol("7203.T")
            },
        ];

        let table = reconcile(records, &requested, tokyo());
        let symbols: Vec<&str> = table.rows().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["7203.T", "9984.T", "AAPL"]);
        assert_eq!(table.rows()[1], QuoteRecord::missing("9984.T"));
        assert_eq!(table.rows()[2].price, Some(dec!(189.5)));
    }

    #[test]
    fn test_empty_response_yields_placeholders() {
        let requested = SymbolSet::from_symbols(["A", "B"]);
        let table = reconcile(Vec::new(), &requested, tokyo());
        assert_eq!(table.len(), 2);
        assert!(table.rows().iter().all(|r| !r.has_price()));
    }

    #[test]
    fn test_extra_duplicate_and_symbolless_records() {
        let requested = SymbolSet::from_symbols(["AAPL"]);
        let records = vec![
            ProviderRecord {
                regular_market_price: Some(1.0),
                ..ProviderRecord::for_symbol("AAPL")
            },
            ProviderRecord {
                regular_market_price: Some(2.0),
                ..ProviderRecord::for_symbol("AAPL")
            },
            ProviderRecord::for_symbol("MSFT"),
            ProviderRecord::default(),
        ];

        let table = reconcile(records, &requested, tokyo());
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].price, Some(dec!(1)));
    }

    #[test]
    fn test_field_mapping() {
        let requested = SymbolSet::from_symbols(["7203.T"]);
        let record = ProviderRecord {
            short_name: Some("  ".to_string()),
            long_name: Some("Toyota Motor Corporation".to_string()),
            regular_market_price: Some(3120.0),
            regular_market_change: Some(-15.5),
            regular_market_change_percent: Some(-0.494),
            market_state: Some("CLOSED".to_string()),
            regular_market_volume: Some(12_345_678.0),
            currency: Some("JPY".to_string()),
            // 2024-05-01T06:00:00Z
            regular_market_time: Some(1_714_543_200),
            ..ProviderRecord::for_symbol("7203.T")
        };

        let table = reconcile(vec![record], &requested, tokyo());
        let row = &table.rows()[0];
        assert_eq!(row.name.as_deref(), Some("Toyota Motor Corporation"));
        assert_eq!(row.price, Some(dec!(3120)));
        assert_eq!(row.change, Some(dec!(-15.5)));
        assert_eq!(row.change_percent, Some(dec!(-0.494)));
        assert_eq!(row.market_state.as_deref(), Some("CLOSED"));
        assert_eq!(row.volume, Some(12_345_678));
        assert_eq!(row.currency.as_deref(), Some("JPY"));
        assert_eq!(
            row.market_time_display().as_deref(),
            Some("2024-05-01 15:00:00")
        );
        assert_eq!(row.market_time.unwrap().offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_short_name_preferred() {
        let requested = SymbolSet::from_symbols(["AAPL"]);
        let record = ProviderRecord {
            short_name: Some("Apple".to_string()),
            long_name: Some("Apple Inc.".to_string()),
            ..ProviderRecord::for_symbol("AAPL")
        };
        let table = reconcile(vec![record], &requested, tokyo());
        assert_eq!(table.rows()[0].name.as_deref(), Some("Apple"));
    }

    #[test]
    fn test_unusable_numbers_are_dropped_per_field() {
        let requested = SymbolSet::from_symbols(["X"]);
        let record = ProviderRecord {
            regular_market_price: Some(f64::NAN),
            regular_market_volume: Some(-5.0),
            regular_market_time: Some(i64::MAX),
            currency: Some("USD".to_string()),
            ..ProviderRecord::for_symbol("X")
        };
        let table = reconcile(vec![record], &requested, tokyo());
        let row = &table.rows()[0];
        assert_eq!(row.price, None);
        assert_eq!(row.volume, None);
        assert_eq!(row.market_time, None);
        assert_eq!(row.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_row_count_always_matches_request() {
        let requested = SymbolSet::from_symbols(["A", "B", "C", "D"]);
        let responses = vec![
            vec![],
            vec![ProviderRecord::for_symbol("B")],
            vec![
                ProviderRecord::for_symbol("D"),
                ProviderRecord::for_symbol("Z"),
                ProviderRecord::for_symbol("A"),
                ProviderRecord::for_symbol("A"),
            ],
        ];
        for records in responses {
            let table = reconcile(records, &requested, tokyo());
            assert_eq!(table.len(), requested.len());
            let symbols: Vec<&String> = table.rows().iter().map(|r| &r.symbol).collect();
            let expected: Vec<&String> = requested.iter().collect();
            assert_eq!(symbols, expected);
        }
    }
}
