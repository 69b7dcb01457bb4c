//! Quote source trait definition.
//!
//! This module defines the `QuoteSource` trait the quote cache fetches
//! through. The Yahoo fetcher is the production implementation.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{ProviderRecord, SymbolSet};

/// Anything that can fetch raw quote records for a symbol set.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use quoteboard_market_data::provider::QuoteSource;
///
/// struct FixedSource(Vec<ProviderRecord>);
///
/// #[async_trait]
/// impl QuoteSource for FixedSource {
///     fn id(&self) -> &'static str {
///         "FIXED"
///     }
///
///     async fn fetch_all(
///         &self,
///         _symbols: &SymbolSet,
///         _chunk_size: usize,
///     ) -> Result<Vec<ProviderRecord>, MarketDataError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Unique identifier for this source, used in logs.
    fn id(&self) -> &'static str;

    /// Fetch records for every symbol, `chunk_size` symbols per request.
    ///
    /// # Returns
    ///
    /// All records in chunk order, or the first chunk failure. Partial
    /// results are never returned.
    async fn fetch_all(
        &self,
        symbols: &SymbolSet,
        chunk_size: usize,
    ) -> Result<Vec<ProviderRecord>, MarketDataError>;
}
