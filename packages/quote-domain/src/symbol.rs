//! Ticker Symbols
//!
//! A symbol ends up as a single URL path segment on both the proxy and the
//! upstream provider, so only characters that need no escaping are allowed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A trimmed, non-empty ticker symbol that is safe as a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Validate and wrap a raw symbol. Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `SymbolError` if the trimmed value is empty, is a dot
    /// segment, or contains a character outside `A-Z a-z 0-9 . - _ ~`.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let symbol = raw.trim();

        if symbol.is_empty() {
            return Err(SymbolError::Empty);
        }

        if symbol == "." || symbol == ".." {
            return Err(SymbolError::DotSegment(symbol.to_string()));
        }

        if let Some(ch) = symbol.chars().find(|&ch| !is_path_safe(ch)) {
            return Err(SymbolError::UnsafeCharacter {
                symbol: symbol.to_string(),
                ch,
            });
        }

        Ok(Self(symbol.to_string()))
    }

    /// Get the symbol text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_path_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_' | '~')
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Symbol validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// Symbol is empty after trimming.
    #[error("symbol cannot be empty")]
    Empty,
    /// Symbol is a relative path segment.
    #[error("symbol {0:?} is not a valid path segment")]
    DotSegment(String),
    /// Symbol contains a character that is unsafe in a URL path segment.
    #[error("symbol {symbol:?} contains unsafe character {ch:?}")]
    UnsafeCharacter {
        /// The rejected symbol.
        symbol: String,
        /// The first offending character.
        ch: char,
    },
}
