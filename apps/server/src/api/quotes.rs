use std::{io, path::Path, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{delete, post},
    Json, Router,
};
use quoteboard_market_data::QuoteOptions;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{QuotesRequest, QuotesResponse},
};

/// Header identifying the caller under the per-caller sharing policy.
pub const CLIENT_ID_HEADER: &str = "x-client-id";
const ANONYMOUS_CALLER: &str = "anonymous";

fn caller_id(headers: &HeaderMap) -> &str {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CALLER)
}

/// Read the default ticker document, decoding it lossily.
async fn read_tickers_file(path: &Path) -> ApiResult<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ApiError::NotFound(format!(
            "No ticker text was uploaded and {} does not exist",
            path.display()
        ))),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("failed to read {}", path.display()))
            .into()),
    }
}

async fn load_quotes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<QuotesRequest>,
) -> ApiResult<Json<QuotesResponse>> {
    let options = QuoteOptions::from_user(
        body.ttl_secs.unwrap_or(state.defaults.ttl.as_secs()),
        body.chunk_size.unwrap_or(state.defaults.chunk_size),
        body.force_refresh.unwrap_or(false),
    )?;
    let text = match body.text {
        Some(text) => text,
        None => read_tickers_file(&state.tickers_file).await?,
    };

    let context = state.pool.context_for(caller_id(&headers)).await;
    let symbols = context.normalize(&text);
    if symbols.is_empty() {
        tracing::warn!("Ticker list contains no symbols");
    }

    match context.quotes(&symbols, options).await {
        Ok(view) => Ok(Json(QuotesResponse::new(symbols, view))),
        Err(source) => {
            let stale = context
                .cached(&symbols, options.chunk_size)
                .await
                .map(|view| Box::new(QuotesResponse::new(symbols.clone(), view)));
            Err(ApiError::MarketData { source, stale })
        }
    }
}

async fn reset_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    state.pool.reset_session(caller_id(&headers)).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.pool.clear_caches().await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", post(load_quotes))
        .route("/session/reset", post(reset_session))
        .route("/cache", delete(clear_cache))
}
