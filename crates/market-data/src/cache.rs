//! TTL cache for reconciled quote tables.
//!
//! Entries are keyed by the exact symbol set and chunk size. An entry stores
//! only when it was fetched; freshness is judged at read time against the TTL
//! the caller passes in, and a TTL different from the previous read drops
//! every entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::MarketDataError;
use crate::models::{QuoteTable, QuoteView, SymbolSet};
use crate::provider::QuoteSource;
use crate::reconcile::reconcile;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    symbols: SymbolSet,
    chunk_size: usize,
}

struct CacheEntry {
    table: QuoteTable,
    fetched_at: Instant,
    fetched_at_utc: DateTime<Utc>,
}

impl CacheEntry {
    fn view(&self) -> QuoteView {
        QuoteView::new(self.table.clone(), self.fetched_at_utc, true)
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    last_ttl: Option<Duration>,
}

impl CacheState {
    /// Drop everything when the TTL differs from the one last seen.
    fn observe_ttl(&mut self, ttl: Duration) {
        if self.last_ttl == Some(ttl) {
            return;
        }
        if let Some(previous) = self.last_ttl {
            if !self.entries.is_empty() {
                info!(
                    "Cache TTL changed from {:?} to {:?}, dropping {} entries",
                    previous,
                    ttl,
                    self.entries.len()
                );
            }
            self.entries.clear();
        }
        self.last_ttl = Some(ttl);
    }

    fn fresh(&self, key: &CacheKey, ttl: Duration) -> Option<QuoteView> {
        self.entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < ttl)
            .map(CacheEntry::view)
    }
}

/// Quote cache in front of a [`QuoteSource`].
///
/// Misses for the same key are single-flight: the first caller fetches while
/// later callers wait on a per-key lock and then read the stored table.
pub struct QuoteCache {
    source: Arc<dyn QuoteSource>,
    timezone: Tz,
    state: Mutex<CacheState>,
    in_flight: StdMutex<FlightMap>,
}

type FlightMap = HashMap<CacheKey, Arc<Mutex<()>>>;

/// A caller's handle on a key's flight lock.
///
/// Dropping it, even when the fetch future is cancelled, removes the map
/// entry once no other caller holds or waits on the lock.
struct Flight<'a> {
    map: &'a StdMutex<FlightMap>,
    key: &'a CacheKey,
    lock: Arc<Mutex<()>>,
}

impl Flight<'_> {
    async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only handed out under the map lock: map + self means idle.
        let idle = map.get(self.key).is_some_and(|held| {
            Arc::ptr_eq(held, &self.lock) && Arc::strong_count(&self.lock) == 2
        });
        if idle {
            map.remove(self.key);
        }
    }
}

impl QuoteCache {
    pub fn new(source: Arc<dyn QuoteSource>, timezone: Tz) -> Self {
        Self {
            source,
            timezone,
            state: Mutex::new(CacheState::default()),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    /// Return the table for `symbols`, fetching only on a miss or when forced.
    ///
    /// A failed fetch leaves any stored entry untouched; use [`peek`] to
    /// render it next to the error.
    ///
    /// [`peek`]: QuoteCache::peek
    pub async fn get(
        &self,
        symbols: &SymbolSet,
        chunk_size: usize,
        ttl: Duration,
        force_refresh: bool,
    ) -> Result<QuoteView, MarketDataError> {
        let key = CacheKey {
            symbols: symbols.clone(),
            chunk_size,
        };

        if !force_refresh {
            if let Some(view) = self.lookup(&key, ttl).await {
                debug!("Cache hit for {} symbols", symbols.len());
                return Ok(view);
            }
        }

        let flight = self.flight(&key);
        let held = flight.acquire().await;
        let result = self.fill(&key, ttl, force_refresh).await;
        drop(held);
        drop(flight);
        result
    }

    /// Fetch and store the table for `key` while holding its flight lock.
    async fn fill(
        &self,
        key: &CacheKey,
        ttl: Duration,
        force_refresh: bool,
    ) -> Result<QuoteView, MarketDataError> {
        // Another caller may have filled the entry while we waited.
        if !force_refresh {
            if let Some(view) = self.lookup(key, ttl).await {
                debug!(
                    "Cache filled by concurrent fetch for {} symbols",
                    key.symbols.len()
                );
                return Ok(view);
            }
        }

        debug!(
            "Cache {} for {} symbols, fetching from {}",
            if force_refresh { "bypass" } else { "miss" },
            key.symbols.len(),
            self.source.id()
        );
        let records = self
            .source
            .fetch_all(&key.symbols, key.chunk_size)
            .await
            .map_err(|e| {
                warn!("Quote fetch failed, keeping cached entry if any: {}", e);
                e
            })?;
        let table = reconcile(records, &key.symbols, self.timezone);

        let entry = CacheEntry {
            table,
            fetched_at: Instant::now(),
            fetched_at_utc: Utc::now(),
        };
        let view = QuoteView::new(entry.table.clone(), entry.fetched_at_utc, false);

        let mut state = self.state.lock().await;
        state.observe_ttl(ttl);
        state.entries.insert(key.clone(), entry);
        Ok(view)
    }

    /// Last stored table for the key, whatever its age.
    pub async fn peek(&self, symbols: &SymbolSet, chunk_size: usize) -> Option<QuoteView> {
        let key = CacheKey {
            symbols: symbols.clone(),
            chunk_size,
        };
        self.state.lock().await.entries.get(&key).map(CacheEntry::view)
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        info!("Clearing {} cached quote tables", state.entries.len());
        state.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn lookup(&self, key: &CacheKey, ttl: Duration) -> Option<QuoteView> {
        let mut state = self.state.lock().await;
        state.observe_ttl(ttl);
        state.fresh(key, ttl)
    }

    fn flight<'a>(&'a self, key: &'a CacheKey) -> Flight<'a> {
        let lock = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        Flight {
            map: &self.in_flight,
            key,
            lock,
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
