/// Provider symbol after normalization (e.g., "AAPL", "7203.T").
///
/// Compared case-sensitively as an opaque string.
pub type Symbol = String;

/// Currency code as reported by the provider (e.g., "USD", "JPY")
pub type Currency = String;
