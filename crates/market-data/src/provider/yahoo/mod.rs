//! Yahoo Finance quote client.
//!
//! Fetches batch quotes from the unofficial v7 quote endpoint:
//! - a cookie session seeded from the landing page ([`SessionManager`])
//! - a crumb, requested only when the endpoint demands one ([`CrumbManager`])
//! - sequential chunked requests with 429/401/403 classification

mod crumb;
mod models;
mod session;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::errors::MarketDataError;
use crate::models::{ProviderRecord, Symbol, SymbolSet};
use crate::provider::QuoteSource;

pub use crumb::{Crumb, CrumbManager};
pub use models::parse_quote_body;
pub use session::{Session, SessionManager};

const ENDPOINT: &str = "quote";

/// Longest response body excerpt kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

// ============================================================================
// Quote Fetcher
// ============================================================================

/// Chunked quote fetcher with an optimistic, crumb-less first attempt.
pub struct YahooQuoteFetcher {
    sessions: Arc<SessionManager>,
    crumbs: Arc<CrumbManager>,
    quote_url: String,
}

impl YahooQuoteFetcher {
    pub fn new(
        config: &ClientConfig,
        sessions: Arc<SessionManager>,
        crumbs: Arc<CrumbManager>,
    ) -> Self {
        Self {
            sessions,
            crumbs,
            quote_url: config.endpoints.quote_url.clone(),
        }
    }

    /// Fetch one chunk of symbols.
    ///
    /// The first request goes out without a crumb. On 401/403 a crumb is
    /// obtained and the request retried exactly once. A 429 at either step
    /// fails the chunk immediately.
    pub async fn fetch_chunk(
        &self,
        session: &Arc<Session>,
        symbols: &[Symbol],
    ) -> Result<Vec<ProviderRecord>, MarketDataError> {
        let joined = symbols.join(",");
        debug!("Requesting {} symbols: {}", symbols.len(), joined);

        let response = self.send(session, &joined, None).await?;
        let response = match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Quote endpoint rate limited");
                return Err(MarketDataError::RateLimited { endpoint: ENDPOINT });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                info!(
                    "Quote endpoint answered {}, retrying with crumb",
                    response.status()
                );
                self.retry_with_crumb(session, &joined).await?
            }
            status if status.is_success() => response,
            _ => return Err(http_error(response).await),
        };

        let body = response
            .text()
            .await
            .map_err(|e| MarketDataError::from_request(ENDPOINT, e))?;
        parse_quote_body(&body)
    }

    /// Fetch every symbol, chunk by chunk, in order.
    ///
    /// Chunks are requested sequentially; the first failing chunk aborts the
    /// whole fetch.
    pub async fn fetch_all(
        &self,
        symbols: &SymbolSet,
        chunk_size: usize,
    ) -> Result<Vec<ProviderRecord>, MarketDataError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(symbols.len());
        for (index, chunk) in symbols.chunks(chunk_size).enumerate() {
            // Re-read per chunk: a crumb refresh may have replaced the session.
            let session = self.sessions.get_session().await?;
            let chunk_records = self.fetch_chunk(&session, chunk).await.map_err(|e| {
                warn!("Chunk {} failed: {}", index + 1, e);
                e
            })?;
            debug!(
                "Chunk {} returned {} of {} symbols",
                index + 1,
                chunk_records.len(),
                chunk.len()
            );
            records.extend(chunk_records);
        }
        Ok(records)
    }

    async fn retry_with_crumb(
        &self,
        session: &Arc<Session>,
        joined: &str,
    ) -> Result<Response, MarketDataError> {
        let crumb = self.crumbs.get_crumb(session).await?;
        let response = self
            .send(crumb.session(), joined, Some(crumb.value()))
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Quote endpoint rate limited after crumb retry");
                Err(MarketDataError::RateLimited { endpoint: ENDPOINT })
            }
            status if status.is_success() => Ok(response),
            status => {
                if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                    warn!("Crumb rejected ({}), resetting session", status);
                    self.crumbs.invalidate().await;
                    self.sessions.reset_if_current(crumb.session()).await;
                }
                Err(http_error(response).await)
            }
        }
    }

    async fn send(
        &self,
        session: &Session,
        symbols: &str,
        crumb: Option<&str>,
    ) -> Result<Response, MarketDataError> {
        let mut request = session
            .client()
            .get(&self.quote_url)
            .query(&[("symbols", symbols)]);
        if let Some(crumb) = crumb {
            request = request.query(&[("crumb", crumb)]);
        }
        request
            .send()
            .await
            .map_err(|e| MarketDataError::from_request(ENDPOINT, e))
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteFetcher {
    fn id(&self) -> &'static str {
        "YAHOO"
    }

    async fn fetch_all(
        &self,
        symbols: &SymbolSet,
        chunk_size: usize,
    ) -> Result<Vec<ProviderRecord>, MarketDataError> {
        YahooQuoteFetcher::fetch_all(self, symbols, chunk_size).await
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Build a `ProviderHttp` error from a failed response, keeping a body excerpt.
async fn http_error(response: Response) -> MarketDataError {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.trim().chars().take(ERROR_BODY_LIMIT).collect();

    MarketDataError::ProviderHttp {
        endpoint: ENDPOINT,
        status: status.as_u16(),
        message: if excerpt.is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", reason, excerpt)
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
