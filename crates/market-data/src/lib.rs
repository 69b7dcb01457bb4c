//! Quoteboard Market Data Crate
//!
//! This crate fetches batch equity quotes from Yahoo Finance's unofficial
//! quote endpoint while staying inside its rate limits and anti-automation
//! checks.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Ticker document normalization (comments, blanks, `7203` -> `7203.T`)
//! - Cookie session bootstrap and serialized crumb acquisition with backoff
//! - Optimistic crumb-less requests, chunked and sequential
//! - One output row per requested symbol, placeholders for dropped ones
//! - A TTL cache with explicit invalidation and single-flight misses
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  Ticker text     | --> |   Normalizer     |  (SymbolSet)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |   QuoteCache     |  (key: SymbolSet + chunk size)
//!                          +------------------+
//!                                  | miss
//!                                  v
//!                          +------------------+     +------------------+
//!                          |  QuoteFetcher    | <-> | Session / Crumb  |
//!                          +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |   Reconciler     |  (QuoteTable)
//!                          +------------------+
//! ```
//!
//! All of this state lives in a [`ClientContext`]; a [`ContextPool`] shares
//! contexts between callers according to a [`SharingPolicy`].
//!
//! # Core Types
//!
//! - [`SymbolSet`] - Canonical, sorted, deduplicated symbol list
//! - [`ProviderRecord`] - Raw provider entry, parsed leniently
//! - [`QuoteRecord`] - One output row
//! - [`QuoteTable`] - Ordered rows, one per requested symbol
//! - [`QuoteView`] - Table plus summary counts and cache provenance
//! - [`MarketDataError`] - Error taxonomy with [`ErrorKind`] and [`RetryClass`]

pub mod cache;
pub mod config;
pub mod context;
pub mod errors;
pub mod models;
pub mod normalizer;
pub mod provider;
pub mod reconcile;

// Re-export all public types from models
pub use models::{
    Currency, ProviderRecord, QuoteRecord, QuoteSummary, QuoteTable, QuoteView, Symbol,
    SymbolSet, MARKET_TIME_FORMAT,
};

// Re-export error types
pub use errors::{ErrorKind, MarketDataError, RetryClass};

// Re-export configuration
pub use config::{
    ClientConfig, Endpoints, QuoteOptions, CHUNK_SIZE_RANGE, DEFAULT_CHUNK_SIZE,
    DEFAULT_TTL_SECS, TTL_SECS_RANGE,
};

// Re-export the pipeline
pub use cache::QuoteCache;
pub use context::{ClientContext, ContextPool, PoolLimits, SharingPolicy};
pub use normalizer::{normalize, NumericSuffixRule, SymbolRules};
pub use provider::yahoo::{CrumbManager, SessionManager, YahooQuoteFetcher};
pub use provider::QuoteSource;
pub use reconcile::reconcile;
