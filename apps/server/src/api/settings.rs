use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use quoteboard_market_data::{CHUNK_SIZE_RANGE, TTL_SECS_RANGE};

use crate::{
    error::ApiResult,
    main_lib::AppState,
    models::{Bounds, SettingsResponse},
};

/// Effective bounds and defaults of the quote options.
async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<SettingsResponse>> {
    Ok(Json(SettingsResponse {
        ttl_secs: Bounds {
            min: *TTL_SECS_RANGE.start(),
            max: *TTL_SECS_RANGE.end(),
            default: state.defaults.ttl.as_secs(),
        },
        chunk_size: Bounds {
            min: *CHUNK_SIZE_RANGE.start(),
            max: *CHUNK_SIZE_RANGE.end(),
            default: state.defaults.chunk_size,
        },
        sharing: state.pool.policy(),
        reference_timezone: state.pool.config().reference_timezone.name().to_string(),
        tickers_file: state.tickers_file.display().to_string(),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/settings", get(get_settings))
}
