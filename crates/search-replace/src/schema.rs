//! Column inspection and type classification.
//!
//! Only textual and binary columns take part in a search/replace run. Numeric,
//! temporal, ENUM/SET and JSON columns are dropped here and never scanned.

use crate::error::SchemaError;
use crate::store::{RawColumn, Store};
use serde::Serialize;

/// Broad category of a searchable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// `CHAR(n)` / `VARCHAR(n)`: bounded, length counted in characters.
    ShortText,
    /// `TINYTEXT` .. `LONGTEXT`.
    LongText,
    /// `BINARY`, `VARBINARY` and the `BLOB` family.
    Binary,
}

/// A searchable column and its declared capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    /// Maximum length in characters; `None` means unbounded.
    pub max_length: Option<u32>,
}

impl ColumnDescriptor {
    pub fn short_text(name: impl Into<String>, max_length: u32) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::ShortText,
            max_length: Some(max_length),
        }
    }

    pub fn long_text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::LongText,
            max_length: None,
        }
    }
}

/// Classify a MySQL column by its declared type string (`COLUMN_TYPE`).
///
/// Returns `None` for columns that are not searched.
///
/// ```
/// use search_replace::schema::{classify_column, ColumnKind};
///
/// let col = classify_column("option_value", "varchar(191)").unwrap();
/// assert_eq!(col.kind, ColumnKind::ShortText);
/// assert_eq!(col.max_length, Some(191));
///
/// assert!(classify_column("ID", "bigint(20) unsigned").is_none());
/// ```
pub fn classify_column(name: &str, column_type: &str) -> Option<ColumnDescriptor> {
    let lower = column_type.trim().to_lowercase();
    let base = lower
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or("");

    let (kind, max_length) = match base {
        "char" | "varchar" => (
            ColumnKind::ShortText,
            // CHAR without a length is CHAR(1)
            Some(extract_length_from_column_type(&lower).unwrap_or(1)),
        ),
        "tinytext" | "text" | "mediumtext" | "longtext" => (ColumnKind::LongText, None),
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
            (ColumnKind::Binary, None)
        }
        _ => return None,
    };

    Some(ColumnDescriptor {
        name: name.to_string(),
        kind,
        max_length,
    })
}

/// List the searchable columns of `table`, in ordinal order.
pub async fn inspect_table<S: Store + ?Sized>(
    store: &mut S,
    table: &str,
) -> Result<Vec<ColumnDescriptor>, SchemaError> {
    let raw: Vec<RawColumn> =
        store
            .describe_columns(table)
            .await
            .map_err(|source| SchemaError {
                table: table.to_string(),
                source,
            })?;

    Ok(raw
        .iter()
        .filter_map(|c| classify_column(&c.name, &c.column_type))
        .collect())
}

/// Extract length from a MySQL column type string.
///
/// E.g., "varchar(255)" -> Some(255)
fn extract_length_from_column_type(column_type: &str) -> Option<u32> {
    let start = column_type.find('(')?;
    let end = column_type.find(')')?;
    if start >= end {
        return None;
    }
    let len_str = &column_type[start + 1..end];
    let first_part = len_str.split(',').next().unwrap_or(len_str);
    first_part.trim().parse().ok()
}
