//! In-memory [`Store`] for tests.
//!
//! Tables keep their declared column types so the engine's schema inspection
//! and length checks behave like they do against MySQL: a write that exceeds
//! a `char(n)`/`varchar(n)` column fails with [`StoreError::LengthConstraint`]
//! and the whole statement is rejected, as in strict SQL mode.

use crate::error::StoreError;
use crate::schema::classify_column;
use crate::store::{RawColumn, Store};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<RawColumn>,
    rows: Vec<Vec<Option<Vec<u8>>>>,
}

impl MemoryTable {
    fn column_index(&self, table: &str, column: &str) -> Result<usize, StoreError> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| StoreError::Backend(format!("Unknown column '{column}' in '{table}'")))
    }

    fn check_fits(&self, idx: usize, value: &[u8]) -> Result<(), StoreError> {
        let column = &self.columns[idx];
        let limit = classify_column(&column.name, &column.column_type).and_then(|c| c.max_length);
        if let Some(max) = limit {
            let chars = String::from_utf8_lossy(value).chars().count();
            if chars > max as usize {
                return Err(StoreError::LengthConstraint(format!(
                    "Data too long for column '{}' at row 1",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

/// Tables held in memory, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, MemoryTable>,
    failing: BTreeSet<String>,
    mutations: usize,
    version: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            version: "8.0.36-memory".to_string(),
            ..Self::default()
        }
    }

    /// Add a table with `(name, column_type)` columns.
    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns
                    .iter()
                    .map(|(n, t)| RawColumn::new(*n, *t))
                    .collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    /// Append a row to `table`; `None` is SQL NULL.
    ///
    /// # Panics
    ///
    /// If the table does not exist or the arity is wrong.
    pub fn with_row(mut self, table: &str, values: &[Option<&str>]) -> Self {
        let t = self
            .tables
            .get_mut(table)
            .unwrap_or_else(|| panic!("no table {table}"));
        assert_eq!(t.columns.len(), values.len(), "row arity for {table}");
        t.rows
            .push(values.iter().map(|v| v.map(|s| s.as_bytes().to_vec())).collect());
        self
    }

    /// Make every write to `table` fail with a backend error.
    pub fn with_failing_writes(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    /// Number of write statements that changed at least one row.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Values of `column` in row order, decoded lossily as UTF-8.
    pub fn column_values(&self, table: &str, column: &str) -> Vec<Option<String>> {
        let Some(t) = self.tables.get(table) else {
            return Vec::new();
        };
        let Some(idx) = t.columns.iter().position(|c| c.name == column) else {
            return Vec::new();
        };
        t.rows
            .iter()
            .map(|row| {
                row[idx]
                    .as_ref()
                    .map(|v| String::from_utf8_lossy(v).into_owned())
            })
            .collect()
    }

    fn table(&self, table: &str) -> Result<&MemoryTable, StoreError> {
        self.tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn writable(&mut self, table: &str) -> Result<&mut MemoryTable, StoreError> {
        if self.failing.contains(table) {
            return Err(StoreError::Backend(format!("Write to '{table}' refused")));
        }
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    /// Apply `rewrite` to every value of `column`, all-or-nothing.
    fn rewrite_column<F>(&mut self, table: &str, column: &str, rewrite: F) -> Result<u64, StoreError>
    where
        F: Fn(&[u8]) -> Option<Vec<u8>>,
    {
        let t = self.writable(table)?;
        let idx = t.column_index(table, column)?;

        let mut updates = Vec::new();
        for (row, values) in t.rows.iter().enumerate() {
            if let Some(new) = values[idx].as_deref().and_then(&rewrite) {
                t.check_fits(idx, &new)?;
                updates.push((row, new));
            }
        }

        let changed = updates.len() as u64;
        for (row, new) in updates {
            t.rows[row][idx] = Some(new);
        }
        if changed > 0 {
            self.mutations += 1;
        }
        Ok(changed)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    php_serialize::contains_bytes(haystack, needle)
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_tables(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.table_names())
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<RawColumn>, StoreError> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn count_matches(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
    ) -> Result<u64, StoreError> {
        Ok(self.matching_values(table, column, search).await?.len() as u64)
    }

    async fn matching_values(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let t = self.table(table)?;
        let idx = t.column_index(table, column)?;
        Ok(t.rows
            .iter()
            .filter_map(|row| row[idx].as_ref())
            .filter(|v| contains(v, search.as_bytes()))
            .cloned()
            .collect())
    }

    async fn update_exact(
        &mut self,
        table: &str,
        column: &str,
        old: &[u8],
        new: &[u8],
    ) -> Result<u64, StoreError> {
        self.rewrite_column(table, column, |v| (v == old).then(|| new.to_vec()))
    }

    async fn replace_in_column(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
        replacement: &str,
    ) -> Result<u64, StoreError> {
        let (search, replacement) = (search.as_bytes(), replacement.as_bytes());
        self.rewrite_column(table, column, |v| {
            contains(v, search).then(|| php_serialize::replace_bytes(v, search, replacement))
        })
    }

    async fn server_version(&mut self) -> Result<String, StoreError> {
        Ok(self.version.clone())
    }

    async fn rename_table(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        if self.tables.contains_key(to) {
            return Err(StoreError::Backend(format!("Table '{to}' already exists")));
        }
        self.writable(from)?;
        if let Some(t) = self.tables.remove(from) {
            self.tables.insert(to.to_string(), t);
            self.mutations += 1;
        }
        Ok(())
    }

    async fn rewrite_key_prefix(
        &mut self,
        table: &str,
        column: &str,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<u64, StoreError> {
        let (old, new) = (old_prefix.as_bytes(), new_prefix.as_bytes());
        self.rewrite_column(table, column, |v| {
            v.strip_prefix(old).map(|rest| [new, rest].concat())
        })
    }
}
