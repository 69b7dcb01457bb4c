use chrono::{DateTime, Utc};
use quoteboard_market_data::{QuoteRecord, QuoteSummary, QuoteView, SharingPolicy, SymbolSet};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuotesRequest {
    /// Uploaded ticker document; the default ticker file is used when absent.
    pub text: Option<String>,
    pub ttl_secs: Option<u64>,
    pub chunk_size: Option<usize>,
    pub force_refresh: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRow {
    #[serde(flatten)]
    pub record: QuoteRecord,
    /// Market time in the reference timezone, e.g. "2024-05-01 15:00:00".
    pub market_time_display: Option<String>,
}

impl From<QuoteRecord> for QuoteRow {
    fn from(record: QuoteRecord) -> Self {
        Self {
            market_time_display: record.market_time_display(),
            record,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuotesResponse {
    pub symbols: SymbolSet,
    pub rows: Vec<QuoteRow>,
    pub summary: QuoteSummary,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl QuotesResponse {
    pub fn new(symbols: SymbolSet, view: QuoteView) -> Self {
        let warning = symbols
            .is_empty()
            .then(|| "No symbols found in the ticker list".to_string());
        Self {
            symbols,
            rows: view.table.rows().iter().cloned().map(QuoteRow::from).collect(),
            summary: view.summary,
            fetched_at: view.fetched_at,
            from_cache: view.from_cache,
            warning,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
    pub default: T,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub ttl_secs: Bounds<u64>,
    pub chunk_size: Bounds<usize>,
    pub sharing: SharingPolicy,
    pub reference_timezone: String,
    pub tickers_file: String,
}
