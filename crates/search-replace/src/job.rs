//! Replacement job description.

use crate::error::JobError;
use crate::length_policy::LengthPolicy;
use serde::Serialize;

/// Which tables a job touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSelection {
    /// Every base table in the database.
    All,
    Named(Vec<String>),
}

impl TableSelection {
    /// Parse a comma-separated list; `all` (or an empty list) selects every table.
    pub fn parse(list: &str) -> Self {
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() || (names.len() == 1 && names[0].eq_ignore_ascii_case("all")) {
            TableSelection::All
        } else {
            TableSelection::Named(names)
        }
    }
}

/// A search/replace request. Read-only once the run starts.
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementJob {
    pub search: String,
    pub replacement: String,
    pub tables: TableSelection,
    /// Decode serialized values and fix their length prefixes after replacing.
    pub handle_serialized: bool,
    /// Report what would change without writing anything.
    pub dry_run: bool,
    pub length_policy: LengthPolicy,
}

impl ReplacementJob {
    /// A job over all tables with the default flags: serialized handling on,
    /// dry run off, `skip` length policy.
    pub fn new(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replacement: replacement.into(),
            tables: TableSelection::All,
            handle_serialized: true,
            dry_run: false,
            length_policy: LengthPolicy::default(),
        }
    }

    pub fn with_tables(mut self, tables: TableSelection) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_handle_serialized(mut self, handle_serialized: bool) -> Self {
        self.handle_serialized = handle_serialized;
        self
    }

    pub fn with_length_policy(mut self, length_policy: LengthPolicy) -> Self {
        self.length_policy = length_policy;
        self
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.search.is_empty() {
            return Err(JobError::EmptySearch);
        }
        if self.search == self.replacement {
            return Err(JobError::NothingToReplace);
        }
        if matches!(&self.tables, TableSelection::Named(names) if names.is_empty()) {
            return Err(JobError::NoTables);
        }
        Ok(())
    }
}
