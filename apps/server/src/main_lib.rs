use std::path::PathBuf;
use std::sync::Arc;

use quoteboard_market_data::{ContextPool, QuoteOptions};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub pool: ContextPool,
    pub tickers_file: PathBuf,
    pub defaults: QuoteOptions,
}

pub fn init_tracing() {
    let log_format = std::env::var("QB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    config
        .defaults
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid default quote options: {e}"))?;

    tracing::info!(
        "Sharing policy: {}, reference timezone: {}, tickers file: {}",
        config.sharing,
        config.client.reference_timezone,
        config.tickers_file.display()
    );
    let pool = ContextPool::with_limits(config.sharing, config.client.clone(), config.pool_limits);

    Ok(Arc::new(AppState {
        pool,
        tickers_file: config.tickers_file.clone(),
        defaults: config.defaults,
    }))
}
