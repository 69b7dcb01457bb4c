//! Anti-bot crumb acquisition and caching.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::session::{Session, SessionManager};
use crate::config::ClientConfig;
use crate::errors::MarketDataError;

const ENDPOINT: &str = "crumb";

/// A crumb plus the session whose cookies it was issued for.
#[derive(Clone, Debug)]
pub struct Crumb {
    value: String,
    acquired_at: Instant,
    session: Arc<Session>,
}

impl Crumb {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn age(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Session to send requests through when using this crumb.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

/// Obtains crumbs and caches the latest one.
///
/// Acquisition is serialized: the cache lock is held for the whole
/// acquisition, so concurrent callers wait and then reuse the new crumb
/// instead of hitting the token endpoint themselves.
pub struct CrumbManager {
    sessions: Arc<SessionManager>,
    crumb_url: String,
    max_age: Duration,
    attempts: u32,
    backoff_base: Duration,
    cached: Mutex<Option<Crumb>>,
}

impl CrumbManager {
    pub fn new(config: &ClientConfig, sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            crumb_url: config.endpoints.crumb_url.clone(),
            max_age: config.crumb_max_age,
            attempts: config.crumb_attempts.max(1),
            backoff_base: config.crumb_backoff_base,
            cached: Mutex::new(None),
        }
    }

    /// Return a crumb valid for the current session cookies.
    ///
    /// A cached crumb is reused while it is younger than the max age and its
    /// session is still the installed one. Otherwise a new crumb is acquired,
    /// starting from `session`.
    pub async fn get_crumb(&self, session: &Arc<Session>) -> Result<Crumb, MarketDataError> {
        let mut cached = self.cached.lock().await;

        if let Some(crumb) = cached.as_ref() {
            if self.is_fresh(crumb) {
                debug!("Reusing crumb aged {:?}", crumb.age());
                return Ok(crumb.clone());
            }
            debug!(
                "Discarding crumb from session #{} aged {:?}",
                crumb.session.generation(),
                crumb.age()
            );
            *cached = None;
        }

        let crumb = self.acquire(session.clone()).await?;
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    /// Forget the cached crumb; the next request acquires a new one.
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            debug!("Crumb invalidated");
        }
    }

    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    fn is_fresh(&self, crumb: &Crumb) -> bool {
        crumb.session.generation() == self.sessions.active_generation()
            && crumb.age() < self.max_age
    }

    async fn acquire(&self, mut session: Arc<Session>) -> Result<Crumb, MarketDataError> {
        let mut rate_limited = false;

        for attempt in 1..=self.attempts {
            if attempt > 1 {
                let delay = self.backoff_delay(attempt - 1);
                debug!("Crumb attempt {} after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            let response = session
                .client()
                .get(&self.crumb_url)
                .send()
                .await
                .map_err(|e| MarketDataError::from_request(ENDPOINT, e))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "Crumb endpoint rate limited (attempt {}/{})",
                    attempt, self.attempts
                );
                rate_limited = true;
                continue;
            }
            if !status.is_success() {
                return Err(MarketDataError::ProviderHttp {
                    endpoint: ENDPOINT,
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("unknown").to_string(),
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| MarketDataError::from_request(ENDPOINT, e))?;
            if let Some(value) = parse_crumb(&body) {
                info!(
                    "Acquired crumb for session #{} on attempt {}",
                    session.generation(),
                    attempt
                );
                return Ok(Crumb {
                    value: value.to_string(),
                    acquired_at: Instant::now(),
                    session,
                });
            }

            warn!("Empty crumb on attempt {}/{}", attempt, self.attempts);
            if attempt < self.attempts {
                // stale cookies are the usual cause
                session = self.sessions.rebootstrap(&session).await?;
            }
        }

        if rate_limited {
            Err(MarketDataError::RateLimited { endpoint: ENDPOINT })
        } else {
            Err(MarketDataError::CrumbUnavailable {
                attempts: self.attempts,
            })
        }
    }
}

/// The crumb is the trimmed body; blank bodies and HTML pages don't count.
fn parse_crumb(body: &str) -> Option<&str> {
    let value = body.trim();
    if value.is_empty() || value.starts_with('<') || value.contains(char::is_whitespace) {
        None
    } else {
        Some(value)
    }
}
