//! Quote data models
//!
//! This module contains the core data types for quote fetching:
//! - `types` - Type aliases for common identifiers (Symbol, Currency)
//! - `symbol` - Canonical symbol list used as request and cache key (SymbolSet)
//! - `provider_record` - Raw, leniently parsed provider quote entries (ProviderRecord)
//! - `quote` - Result rows and tables (QuoteRecord, QuoteTable, QuoteSummary, QuoteView)

mod provider_record;
mod quote;
mod symbol;
mod types;

pub use provider_record::ProviderRecord;
pub use quote::{QuoteRecord, QuoteSummary, QuoteTable, QuoteView, MARKET_TIME_FORMAT};
pub use symbol::SymbolSet;
pub use types::{Currency, Symbol};
