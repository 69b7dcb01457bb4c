//! Yahoo Finance quote endpoint response models.
//!
//! The envelope is parsed leniently: a missing or oddly shaped
//! `quoteResponse.result` means "no matches", not a failure.

use serde::Deserialize;
use tracing::warn;

use crate::errors::MarketDataError;
use crate::models::ProviderRecord;

/// Main response wrapper for the v7 quote API
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteEnvelope {
    #[serde(default)]
    pub quote_response: Option<YahooQuoteResponse>,
}

/// Quote response container
#[derive(Debug, Default, Deserialize)]
pub struct YahooQuoteResponse {
    #[serde(default)]
    pub result: Option<Vec<serde_json::Value>>,
    // Note: error field exists in API but failures arrive as HTTP statuses
}

/// Parse a quote response body into provider records.
///
/// Fails only when the body is not JSON at all. Result entries that are not
/// objects are skipped.
pub fn parse_quote_body(body: &str) -> Result<Vec<ProviderRecord>, MarketDataError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            message: format!("Quote response is not JSON: {}", e),
        })?;

    let envelope: YahooQuoteEnvelope = serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("Unexpected quote envelope shape, treating as empty: {}", e);
        YahooQuoteEnvelope::default()
    });

    let entries = envelope
        .quote_response
        .and_then(|r| r.result)
        .unwrap_or_default();

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<ProviderRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed quote entry: {}", e);
                None
            }
        })
        .collect())
}
