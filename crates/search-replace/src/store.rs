//! Storage backend abstraction.
//!
//! The engine talks to the database only through [`Store`], which keeps the
//! replacement logic independent of the MySQL driver:
//! - `MySqlStore` - a live MySQL/MariaDB connection (`mysql_async`)
//! - `MemoryStore` - an in-memory table set used by tests

use crate::error::StoreError;
use async_trait::async_trait;

/// A column as reported by the store, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    /// Declared type including any length, e.g. `varchar(191)`.
    pub column_type: String,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Operations the search/replace engine and prefix tools need from a database.
///
/// Matching is always literal and case-sensitive: `search` is a substring,
/// never a pattern.
#[async_trait]
pub trait Store: Send {
    /// Base tables of the current database, ordered by name.
    async fn list_tables(&mut self) -> Result<Vec<String>, StoreError>;

    /// Columns of `table` in ordinal order.
    async fn describe_columns(&mut self, table: &str) -> Result<Vec<RawColumn>, StoreError>;

    /// Number of rows whose `column` contains `search`.
    async fn count_matches(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
    ) -> Result<u64, StoreError>;

    /// Raw values of `column` for the rows that contain `search`.
    async fn matching_values(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
    ) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Set `column` to `new` on every row whose value is exactly `old`.
    ///
    /// Returns the number of rows changed.
    async fn update_exact(
        &mut self,
        table: &str,
        column: &str,
        old: &[u8],
        new: &[u8],
    ) -> Result<u64, StoreError>;

    /// Replace `search` with `replacement` in place, on rows containing `search`.
    ///
    /// Returns the number of rows changed.
    async fn replace_in_column(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
        replacement: &str,
    ) -> Result<u64, StoreError>;

    /// Server version string, e.g. `8.0.36`.
    async fn server_version(&mut self) -> Result<String, StoreError>;

    async fn rename_table(&mut self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Swap a leading `old_prefix` for `new_prefix` in `column`.
    ///
    /// Returns the number of rows changed.
    async fn rewrite_key_prefix(
        &mut self,
        table: &str,
        column: &str,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<u64, StoreError>;
}
