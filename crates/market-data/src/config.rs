//! Client and per-request configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

use chrono_tz::Tz;

use crate::errors::MarketDataError;
use crate::normalizer::SymbolRules;

/// Accepted cache TTL range, in seconds.
pub const TTL_SECS_RANGE: RangeInclusive<u64> = 10..=600;

/// Default cache TTL, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 30;

/// Accepted chunk size range (symbols per quote request).
pub const CHUNK_SIZE_RANGE: RangeInclusive<usize> = 1..=200;

/// Default chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Upstream URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// Page fetched once per session to seed cookies.
    pub landing_url: String,
    /// Returns the crumb as a plain-text body.
    pub crumb_url: String,
    /// Batch quote endpoint taking `symbols=` and optionally `crumb=`.
    pub quote_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            landing_url: "https://finance.yahoo.com/".to_string(),
            crumb_url: "https://query2.finance.yahoo.com/v1/test/getcrumb".to_string(),
            quote_url: "https://query2.finance.yahoo.com/v7/finance/quote".to_string(),
        }
    }
}

impl Endpoints {
    /// All three endpoints on one base URL, using the provider's paths.
    /// Handy for pointing the client at a local mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            landing_url: format!("{}/", base),
            crumb_url: format!("{}/v1/test/getcrumb", base),
            quote_url: format!("{}/v7/finance/quote", base),
        }
    }
}

/// Configuration shared by everything inside one client context.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    /// Timeout applied to every upstream request.
    pub request_timeout: Duration,
    /// Crumbs older than this are discarded even if still accepted.
    pub crumb_max_age: Duration,
    /// Maximum crumb acquisition tries.
    pub crumb_attempts: u32,
    /// Delay before the first crumb retry; doubled on each further retry.
    pub crumb_backoff_base: Duration,
    /// Timezone market times are converted to.
    pub reference_timezone: Tz,
    pub symbol_rules: SymbolRules,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            request_timeout: Duration::from_secs(15),
            crumb_max_age: Duration::from_secs(30 * 60),
            crumb_attempts: 3,
            crumb_backoff_base: Duration::from_secs(1),
            reference_timezone: chrono_tz::Asia::Tokyo,
            symbol_rules: SymbolRules::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Per-request options from the configuration surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuoteOptions {
    pub ttl: Duration,
    pub chunk_size: usize,
    /// Bypass a fresh cache entry and fetch again.
    pub force_refresh: bool,
}

impl Default for QuoteOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            force_refresh: false,
        }
    }
}

impl QuoteOptions {
    /// Build options from raw user input, rejecting out-of-range values.
    pub fn from_user(
        ttl_secs: u64,
        chunk_size: usize,
        force_refresh: bool,
    ) -> Result<Self, MarketDataError> {
        let options = Self {
            ttl: Duration::from_secs(ttl_secs),
            chunk_size,
            force_refresh,
        };
        options.validate()?;
        Ok(options)
    }

    /// Check TTL and chunk size against their bounded ranges.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        let ttl_secs = self.ttl.as_secs();
        if !TTL_SECS_RANGE.contains(&ttl_secs) || self.ttl.subsec_nanos() != 0 {
            return Err(MarketDataError::InvalidOption {
                message: format!(
                    "cache TTL {:?} outside {}..={} seconds",
                    self.ttl,
                    TTL_SECS_RANGE.start(),
                    TTL_SECS_RANGE.end()
                ),
            });
        }
        if !CHUNK_SIZE_RANGE.contains(&self.chunk_size) {
            return Err(MarketDataError::InvalidOption {
                message: format!(
                    "chunk size {} outside {}..={}",
                    self.chunk_size,
                    CHUNK_SIZE_RANGE.start(),
                    CHUNK_SIZE_RANGE.end()
                ),
            });
        }
        Ok(())
    }
}
