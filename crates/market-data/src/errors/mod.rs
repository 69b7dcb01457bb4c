//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all quote fetching operations
//! - [`ErrorKind`]: A flat, serializable discriminant callers can branch on
//! - [`RetryClass`]: Classification of the next sensible user action

mod retry;

pub use retry::RetryClass;

use serde::Serialize;
use thiserror::Error;

/// Remedy shown to users whenever the upstream throttles us.
pub const RATE_LIMIT_GUIDANCE: &str =
    "increase the cache TTL, reduce the chunk size, or wait a few minutes before refreshing";

/// Remedy shown when the crumb endpoint keeps answering without a token.
pub const BLOCKED_GUIDANCE: &str =
    "the provider is likely blocking anonymous requests from this address; reset the session or try again later";

/// Errors that can occur while fetching quotes.
///
/// Each variant is classified into an [`ErrorKind`] and a [`RetryClass`] so
/// that the UI boundary can render actionable messages without inspecting
/// error strings.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The landing page could not be reached or answered with a non-success status.
    /// The session stays unbootstrapped; the next attempt bootstraps again.
    #[error("Session bootstrap failed: {message}")]
    Bootstrap {
        /// What went wrong while seeding cookies
        message: String,
    },

    /// The token endpoint answered repeatedly without a token and without an
    /// explicit 429.
    #[error("Crumb unavailable after {attempts} attempts (likely blocked)")]
    CrumbUnavailable {
        /// Number of acquisition attempts made
        attempts: u32,
    },

    /// The provider rate limited the request (HTTP 429), or crumb retries
    /// were exhausted under rate limiting.
    #[error("Rate limited by {endpoint} endpoint: {guidance}", guidance = RATE_LIMIT_GUIDANCE)]
    RateLimited {
        /// The endpoint that throttled the request
        endpoint: &'static str,
    },

    /// Any other non-success HTTP status.
    #[error("Provider HTTP error {status} from {endpoint} endpoint: {message}")]
    ProviderHttp {
        /// The endpoint that returned the status
        endpoint: &'static str,
        /// HTTP status code
        status: u16,
        /// Raw status text or response body excerpt
        message: String,
    },

    /// A request exceeded the configured timeout.
    #[error("Timeout calling {endpoint} endpoint")]
    Timeout {
        /// The endpoint that timed out
        endpoint: &'static str,
    },

    /// The quote endpoint returned a body that is not JSON at all.
    #[error("Invalid provider response: {message}")]
    InvalidResponse {
        /// Parser error description
        message: String,
    },

    /// A configuration value is outside its accepted range.
    #[error("Invalid option: {message}")]
    InvalidOption {
        /// Which option and which bounds
        message: String,
    },

    /// A network error occurred while communicating with the provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Flat error discriminant for callers that branch on the failure type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Bootstrap,
    CrumbUnavailable,
    RateLimited,
    ProviderHttp,
    Timeout,
    InvalidResponse,
    InvalidOption,
    Network,
}

impl MarketDataError {
    /// Map a reqwest failure for `endpoint`, keeping timeouts distinct.
    pub(crate) fn from_request(endpoint: &'static str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { endpoint }
        } else {
            Self::Network(error)
        }
    }

    /// Returns the flat kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Bootstrap { .. } => ErrorKind::Bootstrap,
            Self::CrumbUnavailable { .. } => ErrorKind::CrumbUnavailable,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::ProviderHttp { .. } => ErrorKind::ProviderHttp,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::InvalidOption { .. } => ErrorKind::InvalidOption,
            Self::Network(_) => ErrorKind::Network,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use quoteboard_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { endpoint: "quote" };
    /// assert_eq!(error.retry_class(), RetryClass::AfterBackoff);
    ///
    /// let error = MarketDataError::CrumbUnavailable { attempts: 3 };
    /// assert_eq!(error.retry_class(), RetryClass::ResetSession);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidOption { .. } | Self::InvalidResponse { .. } => RetryClass::Never,

            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network(_) => {
                RetryClass::AfterBackoff
            }

            Self::Bootstrap { .. } | Self::CrumbUnavailable { .. } => RetryClass::ResetSession,

            Self::ProviderHttp { status, .. } => match status {
                401 | 403 => RetryClass::ResetSession,
                500..=599 => RetryClass::AfterBackoff,
                _ => RetryClass::Never,
            },
        }
    }

    /// User-facing remedy, when one exists.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::RateLimited { .. } => Some(RATE_LIMIT_GUIDANCE),
            Self::CrumbUnavailable { .. } => Some(BLOCKED_GUIDANCE),
            Self::ProviderHttp {
                status: 401 | 403, ..
            } => Some(BLOCKED_GUIDANCE),
            _ => None,
        }
    }
}
