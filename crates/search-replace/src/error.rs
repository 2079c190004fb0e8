//! Error types for the search/replace engine.
//!
//! Only [`ConnectionError`] aborts a run. Everything else is isolated to the
//! table or field it happened on and recorded in the run log.

use thiserror::Error;

/// Errors reported by a [`crate::Store`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The table does not exist or is not visible to this connection.
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// The store rejected a value that exceeds the column's capacity.
    #[error("Data too long: {0}")]
    LengthConstraint(String),

    /// Any other rejected query or write.
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_length_constraint(&self) -> bool {
        matches!(self, StoreError::LengthConstraint(_))
    }
}

/// The store could not be reached. Fatal to the whole run.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Host unreachable, credentials rejected or database missing.
    #[error("Failed to connect to MySQL at '{target}': {message}")]
    Connect { target: String, message: String },

    /// Connected, but no database is selected.
    #[error("No database selected for '{0}'")]
    NoDatabase(String),

    /// Connected, but the server did not answer a basic probe.
    #[error("MySQL at '{target}' did not answer: {source}")]
    Probe {
        target: String,
        #[source]
        source: StoreError,
    },
}

/// A table could not be inspected. Fatal to that table only.
#[derive(Error, Debug)]
#[error("Cannot inspect table '{table}': {source}")]
pub struct SchemaError {
    pub table: String,
    #[source]
    pub source: StoreError,
}

/// A replacement job was rejected before any table was touched.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Search text must not be empty")]
    EmptySearch,

    #[error("Search and replacement text are identical")]
    NothingToReplace,

    #[error("No tables selected")]
    NoTables,

    /// Listing the tables of the database failed.
    #[error("Failed to list tables: {0}")]
    ListTables(#[source] StoreError),
}

/// Errors from the table prefix tools.
#[derive(Error, Debug)]
pub enum PrefixError {
    #[error("Invalid prefix '{prefix}': {reason}")]
    Invalid { prefix: String, reason: &'static str },

    #[error("Old and new prefix are both '{0}'")]
    Unchanged(String),

    #[error("No tables start with prefix '{0}'")]
    NoTablesWithPrefix(String),

    #[error("Failed to list tables: {0}")]
    ListTables(#[source] StoreError),
}
