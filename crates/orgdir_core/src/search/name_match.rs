//! Case-insensitive substring matching for organization names.
//!
//! # Invariants
//! - The fragment is matched literally; regex metacharacters have no effect.
//! - Case folding is Unicode-aware (SQLite `LIKE` only folds ASCII).
//! - An empty fragment matches every name.

use regex::{Regex, RegexBuilder};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_FRAGMENT_CHARS: usize = 256;

/// Result type for name matcher construction.
pub type SearchResult<T> = Result<T, SearchError>;

/// Name fragment cannot be turned into a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    FragmentTooLong { chars: usize, max_chars: usize },
    InvalidPattern { fragment: String, message: String },
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FragmentTooLong { chars, max_chars } => write!(
                f,
                "name fragment has {chars} characters; at most {max_chars} are allowed"
            ),
            Self::InvalidPattern { fragment, message } => {
                write!(f, "invalid name fragment `{fragment}`: {message}")
            }
        }
    }
}

impl Error for SearchError {}

/// Compiled case-insensitive literal substring matcher.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    pattern: Regex,
}

impl NameMatcher {
    pub fn new(fragment: &str) -> SearchResult<Self> {
        let chars = fragment.chars().count();
        if chars > MAX_FRAGMENT_CHARS {
            return Err(SearchError::FragmentTooLong {
                chars,
                max_chars: MAX_FRAGMENT_CHARS,
            });
        }

        let pattern = RegexBuilder::new(&regex::escape(fragment))
            .case_insensitive(true)
            .build()
            .map_err(|err| SearchError::InvalidPattern {
                fragment: fragment.to_string(),
                message: err.to_string(),
            })?;

        Ok(Self { pattern })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}
