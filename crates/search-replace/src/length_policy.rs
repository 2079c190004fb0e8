//! What to do when the replacement text does not fit a column.

use crate::schema::ColumnDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy for replacements longer than a column's declared maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthPolicy {
    /// Leave the column untouched and count it as skipped.
    #[default]
    Skip,
    /// Cut the replacement to the column's maximum, on a character boundary.
    Truncate,
    /// Write anyway and let the store accept or reject it.
    Try,
}

/// Result of applying a [`LengthPolicy`] to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthDecision {
    Proceed(String),
    Truncate(String),
    Skip { length: usize, max: u32 },
}

impl LengthPolicy {
    /// Decide how `candidate` may be written into `column`.
    ///
    /// Unbounded columns always proceed. Lengths are counted in characters,
    /// matching how MySQL sizes `CHAR`/`VARCHAR`.
    pub fn decide(self, candidate: &str, column: &ColumnDescriptor) -> LengthDecision {
        let Some(max) = column.max_length else {
            return LengthDecision::Proceed(candidate.to_string());
        };
        let length = candidate.chars().count();
        if length <= max as usize {
            return LengthDecision::Proceed(candidate.to_string());
        }
        match self {
            LengthPolicy::Skip => LengthDecision::Skip { length, max },
            LengthPolicy::Truncate => {
                LengthDecision::Truncate(truncate_chars(candidate, max as usize).to_string())
            }
            LengthPolicy::Try => LengthDecision::Proceed(candidate.to_string()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthPolicy::Skip => "skip",
            LengthPolicy::Truncate => "truncate",
            LengthPolicy::Try => "try",
        }
    }
}

impl fmt::Display for LengthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(LengthPolicy::Skip),
            "truncate" => Ok(LengthPolicy::Truncate),
            "try" => Ok(LengthPolicy::Try),
            other => Err(format!(
                "Unknown length policy '{other}' (expected skip, truncate or try)"
            )),
        }
    }
}

/// First `max` characters of `s`. Never splits a multi-byte character.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
