use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::Symbol;

/// Canonical, deduplicated and lexicographically sorted list of symbols.
///
/// A `SymbolSet` doubles as a cache key, so its order never depends on the
/// order of the input document. It is immutable once built, and a
/// deserialized set goes through the same canonicalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<Symbol>", into = "Vec<Symbol>")]
pub struct SymbolSet(Vec<Symbol>);

impl SymbolSet {
    /// Build a set from already normalized symbols. Duplicates collapse and
    /// the result is sorted; empty strings are dropped.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let unique: BTreeSet<Symbol> = symbols
            .into_iter()
            .map(Into::into)
            .filter(|s: &Symbol| !s.is_empty())
            .collect();
        Self(unique.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.0
    }

    /// Sorted storage makes membership a binary search.
    pub fn contains(&self, symbol: &str) -> bool {
        self.0
            .binary_search_by(|candidate| candidate.as_str().cmp(symbol))
            .is_ok()
    }

    /// Consecutive chunks of at most `size` symbols, in canonical order.
    ///
    /// A `size` of zero is treated as one symbol per chunk.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = &[Symbol]> {
        self.0.chunks(size.max(1))
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl From<Vec<Symbol>> for SymbolSet {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self::from_symbols(symbols)
    }
}

impl From<SymbolSet> for Vec<Symbol> {
    fn from(set: SymbolSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a SymbolSet {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_symbols_dedups_and_sorts() {
        let set = SymbolSet::from_symbols(["MSFT", "AAPL", "MSFT", "7203.T", ""]);
        assert_eq!(set.as_slice(), &["7203.T", "AAPL", "MSFT"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_order_independent_equality() {
        let a = SymbolSet::from_symbols(["B", "A"]);
        let b = SymbolSet::from_symbols(["A", "B", "A"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_contains() {
        let set = SymbolSet::from_symbols(["AAPL", "9984.T"]);
        assert!(set.contains("AAPL"));
        assert!(set.contains("9984.T"));
        assert!(!set.contains("aapl"));
    }

    #[test]
    fn test_chunks_keep_order_and_last_chunk_may_be_smaller() {
        let set = SymbolSet::from_symbols(["A", "B", "C", "D", "E"]);
        let chunks: Vec<Vec<&str>> = set
            .chunks(2)
            .map(|c| c.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(chunks, vec![vec!["A", "B"], vec!["C", "D"], vec!["E"]]);
    }

    #[test]
    fn test_display_joins_with_commas() {
        let set = SymbolSet::from_symbols(["AAPL", "7203.T"]);
        assert_eq!(set.to_string(), "7203.T,AAPL");
    }

    #[test]
    fn test_deserialized_set_is_canonical() {
        let set: SymbolSet = serde_json::from_str(r#"["MSFT","AAPL","AAPL",""]"#).unwrap();
        assert_eq!(set.as_slice(), &["AAPL", "MSFT"]);
        assert_eq!(set, SymbolSet::from_symbols(["AAPL", "MSFT"]));
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["AAPL","MSFT"]"#);
    }
}
