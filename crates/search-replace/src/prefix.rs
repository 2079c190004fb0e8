//! Table prefix detection and renaming.
//!
//! WordPress namespaces its tables with `$table_prefix` (default `wp_`) and
//! also bakes the prefix into a few keys: the `<prefix>user_roles` option of
//! each site and the capability keys in `usermeta`. Changing the prefix means
//! renaming the tables and rewriting those keys.

use crate::error::PrefixError;
use crate::log::RunLog;
use crate::store::Store;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Longest prefix MySQL leaves room for, given WordPress' own table names.
pub const MAX_PREFIX_LEN: usize = 32;

/// Guess the prefix shared by a set of table names.
///
/// Picks the most common leading segment (up to and including the first
/// `_`), then narrows it to the longest prefix shared by the tables in that
/// group, cut back to its last `_`.
///
/// ```
/// use search_replace::prefix::detect_common_prefix;
///
/// let tables: Vec<String> = ["wp_options", "wp_posts", "wp_postmeta", "other"]
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// assert_eq!(detect_common_prefix(&tables).as_deref(), Some("wp_"));
/// ```
pub fn detect_common_prefix(tables: &[String]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for table in tables {
        if let Some(idx) = table.find('_') {
            *counts.entry(&table[..=idx]).or_default() += 1;
        }
    }
    // Ties go to the alphabetically first segment.
    let (segment, _) = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))?;

    let mut group = tables.iter().filter(|t| t.starts_with(segment));
    let first = group.next()?;
    let common = group.fold(first.as_str(), |acc, t| common_prefix(acc, t));

    let cut = common.rfind('_')?;
    Some(common[..=cut].to_string())
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

/// Check that `prefix` is usable as a table prefix.
pub fn validate_prefix(prefix: &str) -> Result<(), PrefixError> {
    let invalid = |reason| PrefixError::Invalid {
        prefix: prefix.to_string(),
        reason,
    };
    if prefix.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(invalid("must be at most 32 characters"));
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid("only letters, digits and underscores are allowed"));
    }
    Ok(())
}

/// Counters for a prefix change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefixChangeStats {
    pub tables_renamed: u64,
    pub tables_failed: u64,
    pub keys_rewritten: u64,
    pub keys_failed: u64,
    pub dry_run: bool,
}

impl PrefixChangeStats {
    /// Whether at least one table was renamed and none failed, so the site
    /// can be pointed at the new prefix.
    pub fn all_tables_renamed(&self) -> bool {
        self.tables_renamed > 0 && self.tables_failed == 0
    }
}

impl fmt::Display for PrefixChangeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would rename" } else { "renamed" };
        writeln!(
            f,
            "Tables: {} {verb}, {} failed",
            self.tables_renamed, self.tables_failed
        )?;
        write!(
            f,
            "Keys: {} rewritten, {} failed",
            self.keys_rewritten, self.keys_failed
        )
    }
}

/// Rename every table starting with `old` to start with `new` instead, then
/// rewrite the prefixed option and usermeta keys.
///
/// A table that cannot be renamed (including when the target name is taken)
/// is logged and counted; the others still proceed.
pub async fn change_prefix<S: Store + ?Sized>(
    store: &mut S,
    old: &str,
    new: &str,
    dry_run: bool,
    log: &mut RunLog,
) -> Result<PrefixChangeStats, PrefixError> {
    validate_prefix(old)?;
    validate_prefix(new)?;
    if old == new {
        return Err(PrefixError::Unchanged(old.to_string()));
    }

    let tables = store.list_tables().await.map_err(PrefixError::ListTables)?;
    let existing: HashSet<&str> = tables.iter().map(String::as_str).collect();
    let targets: Vec<&String> = tables.iter().filter(|t| t.starts_with(old)).collect();
    if targets.is_empty() {
        return Err(PrefixError::NoTablesWithPrefix(old.to_string()));
    }

    let mut stats = PrefixChangeStats {
        dry_run,
        ..PrefixChangeStats::default()
    };
    log.info(format!(
        "Changing prefix '{old}' to '{new}' on {} table(s){}",
        targets.len(),
        if dry_run { " (dry run)" } else { "" }
    ));

    let mut renamed: Vec<&str> = Vec::new();
    for table in targets {
        let suffix = &table[old.len()..];
        let target = format!("{new}{suffix}");
        if existing.contains(target.as_str()) {
            log.error(format!("Cannot rename {table}: {target} already exists"));
            stats.tables_failed += 1;
            continue;
        }
        if dry_run {
            log.info(format!("Would rename {table} to {target}"));
            stats.tables_renamed += 1;
            renamed.push(suffix);
            continue;
        }
        match store.rename_table(table, &target).await {
            Ok(()) => {
                log.success(format!("Renamed {table} to {target}"));
                stats.tables_renamed += 1;
                renamed.push(suffix);
            }
            Err(e) => {
                log.error(format!("Failed to rename {table}: {e}"));
                stats.tables_failed += 1;
            }
        }
    }

    for suffix in renamed {
        let table = format!("{new}{suffix}");

        if let Some(site) = options_site(suffix) {
            let old_key = format!("{old}{site}user_roles");
            let new_key = format!("{new}{site}user_roles");
            if dry_run {
                log.info(format!("Would rename option {old_key} to {new_key} in {table}"));
                continue;
            }
            match store
                .update_exact(&table, "option_name", old_key.as_bytes(), new_key.as_bytes())
                .await
            {
                Ok(rows) => {
                    stats.keys_rewritten += rows;
                    log.success(format!("Renamed option {old_key} to {new_key} in {table}"));
                }
                Err(e) => {
                    stats.keys_failed += 1;
                    log.error(format!("Failed to rename option {old_key} in {table}: {e}"));
                }
            }
        } else if suffix == "usermeta" {
            if dry_run {
                log.info(format!("Would rewrite meta_key prefix in {table}"));
                continue;
            }
            match store.rewrite_key_prefix(&table, "meta_key", old, new).await {
                Ok(rows) => {
                    stats.keys_rewritten += rows;
                    log.success(format!("Rewrote {rows} meta_key value(s) in {table}"));
                }
                Err(e) => {
                    stats.keys_failed += 1;
                    log.error(format!("Failed to rewrite meta keys in {table}: {e}"));
                }
            }
        }
    }

    Ok(stats)
}

/// For an options table suffix, the site part of its `user_roles` key:
/// `options` is the main site (`""`), `3_options` is site 3 (`"3_"`).
fn options_site(suffix: &str) -> Option<&str> {
    if suffix == "options" {
        return Some("");
    }
    let site = suffix.strip_suffix("options")?;
    let digits = site.strip_suffix('_')?;
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(site)
    } else {
        None
    }
}
