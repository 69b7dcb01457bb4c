use std::{net::SocketAddr, path::PathBuf, time::Duration};

use chrono_tz::Tz;
use quoteboard_market_data::{
    ClientConfig, NumericSuffixRule, PoolLimits, QuoteOptions, SharingPolicy, SymbolRules,
    DEFAULT_CHUNK_SIZE, DEFAULT_TTL_SECS,
};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Ticker document read when a request carries no text.
    pub tickers_file: PathBuf,
    pub sharing: SharingPolicy,
    /// Bounds on per-caller contexts under the per-caller policy.
    pub pool_limits: PoolLimits,
    /// Options applied when a request leaves them out.
    pub defaults: QuoteOptions,
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(60_000),
            tickers_file: PathBuf::from("tickers.txt"),
            sharing: SharingPolicy::Shared,
            pool_limits: PoolLimits::default(),
            defaults: QuoteOptions::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = std::env::var("QB_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .expect("Invalid QB_LISTEN_ADDR");
        let cors_allow = std::env::var("QB_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("QB_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "60000".into())
            .parse()
            .unwrap_or(60000);
        let tickers_file = std::env::var("QB_TICKERS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.tickers_file);
        let sharing = std::env::var("QB_SHARING")
            .map(|s| s.parse().expect("Invalid QB_SHARING"))
            .unwrap_or_default();
        let pool_limits = pool_limits(
            env_number("QB_MAX_CALLERS", defaults.pool_limits.max_callers),
            env_number(
                "QB_CALLER_IDLE_SECS",
                defaults.pool_limits.caller_idle.as_secs(),
            ),
        );

        let ttl_secs = env_number("QB_DEFAULT_TTL_SECS", DEFAULT_TTL_SECS);
        let chunk_size = env_number("QB_DEFAULT_CHUNK_SIZE", DEFAULT_CHUNK_SIZE);
        let defaults_options = QuoteOptions::from_user(ttl_secs, chunk_size, false)
            .expect("Invalid QB_DEFAULT_TTL_SECS or QB_DEFAULT_CHUNK_SIZE");

        let mut client = defaults.client;
        client.request_timeout = Duration::from_secs(env_number(
            "QB_UPSTREAM_TIMEOUT_SECS",
            client.request_timeout.as_secs(),
        ));
        client.crumb_max_age = Duration::from_secs(env_number(
            "QB_CRUMB_MAX_AGE_SECS",
            client.crumb_max_age.as_secs(),
        ));
        if let Ok(tz) = std::env::var("QB_REFERENCE_TZ") {
            client.reference_timezone = tz.parse::<Tz>().expect("Invalid QB_REFERENCE_TZ");
        }
        if let Ok(suffix) = std::env::var("QB_EXCHANGE_SUFFIX") {
            client.symbol_rules = suffix_rules(suffix.trim());
        }

        Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            tickers_file,
            sharing,
            pool_limits,
            defaults: defaults_options,
            client,
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Zero values are raised to one so the pool can always hold a caller.
fn pool_limits(max_callers: u64, idle_secs: u64) -> PoolLimits {
    PoolLimits {
        max_callers: max_callers.max(1),
        caller_idle: Duration::from_secs(idle_secs.max(1)),
    }
}

/// Rules for bare 4-digit codes; an empty suffix keeps them as typed.
fn suffix_rules(suffix: &str) -> SymbolRules {
    if suffix.is_empty() {
        SymbolRules::verbatim()
    } else {
        SymbolRules {
            numeric_suffixes: vec![NumericSuffixRule::new(4, suffix.to_string())],
        }
    }
}
