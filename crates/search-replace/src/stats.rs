//! Counters for a search/replace run.

use serde::Serialize;
use std::fmt;

/// Outcome counters, accumulated across the whole run.
///
/// A "field" is one (table, column) pair that had at least one match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub fields_updated: u64,
    pub fields_failed: u64,
    pub fields_skipped: u64,
    pub fields_truncated: u64,
    pub rows_affected: u64,
    pub tables_processed: u64,
    pub tables_with_matches: u64,
    pub tables_without_matches: u64,
    pub tables_errored: u64,
    /// Counts describe what would have been written, nothing was.
    pub dry_run: bool,
}

impl RunStats {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// True when no field failed and no table errored.
    pub fn is_clean(&self) -> bool {
        self.fields_failed == 0 && self.tables_errored == 0
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would update" } else { "updated" };
        writeln!(
            f,
            "Tables: {} processed, {} with matches, {} without matches, {} errored",
            self.tables_processed,
            self.tables_with_matches,
            self.tables_without_matches,
            self.tables_errored
        )?;
        writeln!(
            f,
            "Fields: {} {verb}, {} failed, {} skipped, {} truncated",
            self.fields_updated, self.fields_failed, self.fields_skipped, self.fields_truncated
        )?;
        write!(f, "Rows {verb}: {}", self.rows_affected)
    }
}
