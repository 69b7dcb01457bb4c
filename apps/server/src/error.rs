use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quoteboard_market_data::{ErrorKind, MarketDataError};
use serde::Serialize;
use thiserror::Error;

use crate::models::QuotesResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    /// A fetch failed; `stale` holds the last table for the same key, if any.
    #[error("{source}")]
    MarketData {
        source: MarketDataError,
        stale: Option<Box<QuotesResponse>>,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    // Surface the underlying error message to help debugging during development
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<MarketDataError> for ApiError {
    fn from(source: MarketDataError) -> Self {
        ApiError::MarketData {
            source,
            stale: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    guidance: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stale: Option<Box<QuotesResponse>>,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::CrumbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::InvalidOption => StatusCode::BAD_REQUEST,
        ErrorKind::Bootstrap
        | ErrorKind::ProviderHttp
        | ErrorKind::Network
        | ErrorKind::InvalidResponse => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, kind, guidance, stale) = match self {
            ApiError::MarketData { source, stale } => {
                let kind = source.kind();
                (status_for(kind), Some(kind), source.guidance(), stale)
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None, None, None),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None, None, None),
            ApiError::Anyhow(_) => (StatusCode::INTERNAL_SERVER_ERROR, None, None, None),
        };
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {}", status, message);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            kind,
            message,
            guidance,
            stale,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
