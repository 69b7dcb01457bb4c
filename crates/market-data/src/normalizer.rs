//! Ticker list normalization.
//!
//! Turns a free-form ticker document (one symbol per line, `#` comments,
//! blank lines) into a canonical [`SymbolSet`].

use std::borrow::Cow;

use crate::models::{Symbol, SymbolSet};

/// Lines starting with this marker are ignored.
pub const COMMENT_MARKER: char = '#';

/// Appends an exchange suffix to bare numeric codes of a given width.
///
/// Yahoo identifies Tokyo Stock Exchange listings as `<code>.T`, so a bare
/// `7203` must become `7203.T` before it is sent upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumericSuffixRule {
    /// Exact number of ASCII digits the line must consist of.
    pub digits: usize,
    /// The suffix to append (e.g., ".T").
    pub suffix: Cow<'static, str>,
}

impl NumericSuffixRule {
    pub fn new(digits: usize, suffix: impl Into<Cow<'static, str>>) -> Self {
        Self {
            digits,
            suffix: suffix.into(),
        }
    }

    fn apply(&self, line: &str) -> Option<Symbol> {
        let matches = line.len() == self.digits && line.bytes().all(|b| b.is_ascii_digit());
        matches.then(|| format!("{}{}", line, self.suffix))
    }
}

/// Normalization rules for ticker documents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolRules {
    /// Suffix rules, tried in order; the first match wins.
    pub numeric_suffixes: Vec<NumericSuffixRule>,
}

impl Default for SymbolRules {
    fn default() -> Self {
        Self {
            numeric_suffixes: vec![NumericSuffixRule::new(4, ".T")],
        }
    }
}

impl SymbolRules {
    /// Rules that leave every symbol untouched.
    pub fn verbatim() -> Self {
        Self {
            numeric_suffixes: Vec::new(),
        }
    }

    /// Normalize a single line. Returns `None` for blank and comment lines.
    pub fn normalize_line(&self, line: &str) -> Option<Symbol> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            return None;
        }

        let symbol = self
            .numeric_suffixes
            .iter()
            .find_map(|rule| rule.apply(line))
            .unwrap_or_else(|| line.to_string());
        Some(symbol)
    }

    /// Normalize a whole document into a deduplicated, sorted set.
    ///
    /// Never fails; empty input yields an empty set, which callers treat as
    /// "nothing to fetch".
    pub fn normalize(&self, text: &str) -> SymbolSet {
        SymbolSet::from_symbols(
            text.split(is_line_break)
                .filter_map(|line| self.normalize_line(line)),
        )
    }
}

/// Line boundaries: `\n`, a lone `\r`, and the other Unicode line and
/// record separators. `\r\n` yields an empty piece, which is dropped as blank.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}'
            | '\u{2028}' | '\u{2029}'
    )
}

/// Normalize with the default rules.
pub fn normalize(text: &str) -> SymbolSet {
    SymbolRules::default().normalize(text)
}
