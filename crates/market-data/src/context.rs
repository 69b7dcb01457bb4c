//! Explicitly scoped client state: session, crumb and quote cache.
//!
//! A [`ClientContext`] bundles everything a fetch needs. A [`ContextPool`]
//! decides how contexts are shared between callers according to a
//! [`SharingPolicy`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::QuoteCache;
use crate::config::{ClientConfig, QuoteOptions};
use crate::errors::MarketDataError;
use crate::models::{QuoteTable, QuoteView, SymbolSet};
use crate::provider::yahoo::{CrumbManager, SessionManager, YahooQuoteFetcher};
use crate::provider::QuoteSource;

// ============================================================================
// Client Context
// ============================================================================

/// Session, crumb cache and quote cache for one caller (or for everyone).
pub struct ClientContext {
    config: ClientConfig,
    sessions: Arc<SessionManager>,
    crumbs: Arc<CrumbManager>,
    cache: QuoteCache,
}

impl ClientContext {
    /// Build a context that fetches from Yahoo Finance.
    pub fn new(config: ClientConfig) -> Self {
        let sessions = Arc::new(SessionManager::new(&config));
        let crumbs = Arc::new(CrumbManager::new(&config, sessions.clone()));
        let fetcher = Arc::new(YahooQuoteFetcher::new(
            &config,
            sessions.clone(),
            crumbs.clone(),
        ));
        let cache = QuoteCache::new(fetcher, config.reference_timezone);
        Self {
            config,
            sessions,
            crumbs,
            cache,
        }
    }

    /// Build a context whose cache fetches from `source` instead.
    pub fn with_source(config: ClientConfig, source: Arc<dyn QuoteSource>) -> Self {
        let sessions = Arc::new(SessionManager::new(&config));
        let crumbs = Arc::new(CrumbManager::new(&config, sessions.clone()));
        let cache = QuoteCache::new(source, config.reference_timezone);
        Self {
            config,
            sessions,
            crumbs,
            cache,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Normalize a ticker document with this context's symbol rules.
    pub fn normalize(&self, raw_text: &str) -> SymbolSet {
        self.config.symbol_rules.normalize(raw_text)
    }

    /// Normalize `raw_text` and return its quote table.
    pub async fn load(
        &self,
        raw_text: &str,
        options: QuoteOptions,
    ) -> Result<QuoteView, MarketDataError> {
        let symbols = self.normalize(raw_text);
        self.quotes(&symbols, options).await
    }

    /// Quote table for an already normalized set.
    ///
    /// An empty set returns an empty view without touching the network. The
    /// whole fetch, chunks and crumb retries included, is bounded by the
    /// per-request timeout.
    pub async fn quotes(
        &self,
        symbols: &SymbolSet,
        options: QuoteOptions,
    ) -> Result<QuoteView, MarketDataError> {
        options.validate()?;
        if symbols.is_empty() {
            debug!("No symbols requested, skipping fetch");
            return Ok(QuoteView::new(QuoteTable::default(), Utc::now(), false));
        }
        let fetch = self.cache.get(
            symbols,
            options.chunk_size,
            options.ttl,
            options.force_refresh,
        );
        tokio::time::timeout(self.config.request_timeout, fetch)
            .await
            .unwrap_or_else(|_| {
                warn!(
                    "Quote fetch for {} symbols exceeded {:?}",
                    symbols.len(),
                    self.config.request_timeout
                );
                Err(MarketDataError::Timeout { endpoint: "quote" })
            })
    }

    /// Forget the crumb and the session; the next fetch bootstraps again.
    pub async fn reset_session(&self) {
        info!("Session reset requested");
        self.crumbs.invalidate().await;
        self.sessions.reset_session().await;
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Last stored table for the key regardless of age.
    pub async fn cached(&self, symbols: &SymbolSet, chunk_size: usize) -> Option<QuoteView> {
        self.cache.peek(symbols, chunk_size).await
    }

    /// Generation of the live session, 0 when none is bootstrapped.
    pub fn session_generation(&self) -> u64 {
        self.sessions.active_generation()
    }
}

// ============================================================================
// Sharing Policy
// ============================================================================

/// How contexts are shared between external callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharingPolicy {
    /// One process-wide context; least upstream traffic.
    #[default]
    Shared,
    /// One context per caller id; no state shared between callers.
    PerCaller,
}

impl SharingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingPolicy::Shared => "shared",
            SharingPolicy::PerCaller => "per-caller",
        }
    }
}

impl fmt::Display for SharingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SharingPolicy {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(SharingPolicy::Shared),
            "per-caller" | "per_caller" => Ok(SharingPolicy::PerCaller),
            other => Err(MarketDataError::InvalidOption {
                message: format!(
                    "unknown sharing policy '{}', expected 'shared' or 'per-caller'",
                    other
                ),
            }),
        }
    }
}

// ============================================================================
// Context Pool
// ============================================================================

/// Bounds on per-caller contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolLimits {
    /// Most caller contexts kept at once; least valuable ones are evicted.
    pub max_callers: u64,
    /// A caller context unused for this long is dropped with its session.
    pub caller_idle: Duration,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_callers: 1_000,
            caller_idle: Duration::from_secs(30 * 60),
        }
    }
}

/// Hands out contexts according to a [`SharingPolicy`].
pub struct ContextPool {
    policy: SharingPolicy,
    config: ClientConfig,
    shared: Arc<ClientContext>,
    callers: Cache<String, Arc<ClientContext>>,
}

impl ContextPool {
    pub fn new(policy: SharingPolicy, config: ClientConfig) -> Self {
        Self::with_limits(policy, config, PoolLimits::default())
    }

    pub fn with_limits(policy: SharingPolicy, config: ClientConfig, limits: PoolLimits) -> Self {
        Self {
            policy,
            shared: Arc::new(ClientContext::new(config.clone())),
            config,
            callers: Cache::builder()
                .max_capacity(limits.max_callers)
                .time_to_idle(limits.caller_idle)
                .build(),
        }
    }

    pub fn policy(&self) -> SharingPolicy {
        self.policy
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Context for `caller_id`; created on first use under `PerCaller`.
    pub async fn context_for(&self, caller_id: &str) -> Arc<ClientContext> {
        if self.policy == SharingPolicy::Shared {
            return self.shared.clone();
        }

        let config = self.config.clone();
        let caller = caller_id.to_string();
        self.callers
            .get_with(caller.clone(), async move {
                debug!("Creating client context for caller '{}'", caller);
                Arc::new(ClientContext::new(config))
            })
            .await
    }

    /// Number of live caller contexts, after pending evictions.
    pub async fn caller_count(&self) -> u64 {
        self.callers.run_pending_tasks().await;
        self.callers.entry_count()
    }

    /// Reset the session used by `caller_id`.
    pub async fn reset_session(&self, caller_id: &str) {
        self.context_for(caller_id).await.reset_session().await;
    }

    /// Clear the quote cache of every context in the pool.
    pub async fn clear_caches(&self) {
        self.shared.clear_cache().await;
        let callers: Vec<Arc<ClientContext>> =
            self.callers.iter().map(|(_, context)| context).collect();
        for context in callers {
            context.clear_cache().await;
        }
    }
}
