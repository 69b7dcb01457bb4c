use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One raw entry of the provider's quote result list.
///
/// Every field is parsed leniently: a field with an unexpected type becomes
/// `None` instead of failing the whole record, so one odd value never costs
/// the rest of the row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub short_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub long_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub regular_market_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub regular_market_change: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub regular_market_change_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub market_state: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub regular_market_volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    /// Unix epoch seconds
    #[serde(default, deserialize_with = "lenient")]
    pub regular_market_time: Option<i64>,
}

impl ProviderRecord {
    /// Record carrying only a symbol; mostly useful in tests.
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }
}

/// Deserialize any JSON value, keeping it only if it converts to `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}
