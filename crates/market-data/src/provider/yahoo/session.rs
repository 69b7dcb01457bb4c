//! Cookie-carrying HTTP session against the provider.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::errors::MarketDataError;

/// One bootstrapped HTTP client plus its cookie jar.
///
/// Every request made through the client updates the shared jar; crumbs are
/// only valid for the cookies of the session they were obtained under.
#[derive(Debug)]
pub struct Session {
    client: reqwest::Client,
    generation: u64,
}

impl Session {
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Monotonic id; a new bootstrap always gets a higher one.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the lazily bootstrapped session of one client context.
pub struct SessionManager {
    landing_url: String,
    user_agent: String,
    request_timeout: Duration,
    current: RwLock<Option<Arc<Session>>>,
    next_generation: AtomicU64,
    /// Generation of the installed session, 0 when none is installed.
    active_generation: AtomicU64,
}

impl SessionManager {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            landing_url: config.endpoints.landing_url.clone(),
            user_agent: config.user_agent.clone(),
            request_timeout: config.request_timeout,
            current: RwLock::new(None),
            next_generation: AtomicU64::new(1),
            active_generation: AtomicU64::new(0),
        }
    }

    /// Return the current session, bootstrapping one if needed.
    ///
    /// Concurrent callers wait for a single bootstrap. A failed bootstrap
    /// leaves the manager empty, so the next call tries again.
    pub async fn get_session(&self) -> Result<Arc<Session>, MarketDataError> {
        if let Some(session) = self.current.read().await.as_ref() {
            return Ok(session.clone());
        }

        let mut current = self.current.write().await;
        if let Some(session) = current.as_ref() {
            return Ok(session.clone());
        }
        let session = Arc::new(self.bootstrap().await?);
        self.active_generation
            .store(session.generation(), Ordering::SeqCst);
        *current = Some(session.clone());
        Ok(session)
    }

    /// Drop the current session; the next fetch bootstraps a fresh one.
    pub async fn reset_session(&self) {
        let mut current = self.current.write().await;
        if let Some(old) = current.take() {
            info!("Reset provider session #{}", old.generation());
        }
        self.active_generation.store(0, Ordering::SeqCst);
    }

    /// Reset only if `stale` is still the installed session.
    pub async fn reset_if_current(&self, stale: &Session) {
        let mut current = self.current.write().await;
        if current
            .as_ref()
            .is_some_and(|s| s.generation() == stale.generation())
        {
            current.take();
            self.active_generation.store(0, Ordering::SeqCst);
            info!("Reset provider session #{} after auth failure", stale.generation());
        }
    }

    /// Replace `stale` with a freshly bootstrapped session.
    ///
    /// If another caller already replaced it, the newer session is returned
    /// without bootstrapping again.
    pub async fn rebootstrap(&self, stale: &Session) -> Result<Arc<Session>, MarketDataError> {
        let mut current = self.current.write().await;
        if let Some(session) = current.as_ref() {
            if session.generation() != stale.generation() {
                debug!(
                    "Session #{} already replaced by #{}",
                    stale.generation(),
                    session.generation()
                );
                return Ok(session.clone());
            }
        }

        current.take();
        self.active_generation.store(0, Ordering::SeqCst);
        let session = Arc::new(self.bootstrap().await?);
        self.active_generation
            .store(session.generation(), Ordering::SeqCst);
        *current = Some(session.clone());
        Ok(session)
    }

    /// Generation of the installed session, or 0 if none.
    pub fn active_generation(&self) -> u64 {
        self.active_generation.load(Ordering::SeqCst)
    }

    /// Build a client and seed its cookie jar from the landing page.
    async fn bootstrap(&self) -> Result<Session, MarketDataError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        info!(
            "Bootstrapping provider session #{} via {}",
            generation, self.landing_url
        );

        let client = reqwest::Client::builder()
            .default_headers(self.default_headers()?)
            .cookie_store(true)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| MarketDataError::Bootstrap {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let response = client
            .get(&self.landing_url)
            .send()
            .await
            .map_err(|e| MarketDataError::Bootstrap {
                message: format!("Failed to reach landing page: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::Bootstrap {
                message: format!("Landing page returned {}", status),
            });
        }

        Ok(Session { client, generation })
    }

    /// Browser-like headers; bare clients are rejected far more often.
    fn default_headers(&self) -> Result<HeaderMap, MarketDataError> {
        let invalid = |name: &str, e: header::InvalidHeaderValue| MarketDataError::Bootstrap {
            message: format!("Invalid {} header: {}", name, e),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.user_agent).map_err(|e| invalid("user-agent", e))?,
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&self.landing_url).map_err(|e| invalid("referer", e))?,
        );
        Ok(headers)
    }
}
