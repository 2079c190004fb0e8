//! Runs a replacement job table by table, column by column.
//!
//! Tables and columns are visited strictly in order. Nothing is wrapped in a
//! transaction: each write is applied as soon as it is issued, and a failure
//! only affects the field it happened on.

use crate::error::{JobError, StoreError};
use crate::job::{ReplacementJob, TableSelection};
use crate::length_policy::LengthDecision;
use crate::log::RunLog;
use crate::schema::{inspect_table, ColumnDescriptor};
use crate::stats::RunStats;
use crate::store::Store;
use php_serialize::{is_serialized, replace_bytes, replace_serialized, Replaced};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How a table ended up after all its columns were processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOutcome {
    Matched,
    NoMatches,
    Errored,
}

/// Reported after each table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableProgress {
    pub table: String,
    /// 1-based position of this table in the run.
    pub index: usize,
    pub total: usize,
    pub outcome: TableOutcome,
}

/// Receives a [`TableProgress`] after every table.
pub trait Progress {
    fn table_finished(&mut self, progress: &TableProgress);
}

impl<F> Progress for F
where
    F: FnMut(&TableProgress),
{
    fn table_finished(&mut self, progress: &TableProgress) {
        self(progress)
    }
}

/// Everything a finished run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    pub log: RunLog,
}

/// Execute `job` against `store`.
///
/// Returns an error only when the job cannot start (invalid input, or the
/// table list cannot be read). Per-table and per-field failures are counted
/// in the returned statistics instead.
pub async fn run_replacement<S: Store + ?Sized>(
    store: &mut S,
    job: &ReplacementJob,
    progress: &mut dyn Progress,
) -> Result<RunSummary, JobError> {
    job.validate()?;

    let tables = match &job.tables {
        TableSelection::All => store.list_tables().await.map_err(JobError::ListTables)?,
        TableSelection::Named(names) => names.clone(),
    };
    if tables.is_empty() {
        return Err(JobError::NoTables);
    }

    let mut ctx = RunContext {
        stats: RunStats::new(job.dry_run),
        log: RunLog::new(),
    };

    ctx.log.info(format!(
        "Replacing '{}' with '{}' in {} table(s){}",
        job.search,
        job.replacement,
        tables.len(),
        if job.dry_run { " (dry run)" } else { "" }
    ));

    let total = tables.len();
    for (i, table) in tables.iter().enumerate() {
        let outcome = process_table(store, job, table, &mut ctx).await;

        ctx.stats.tables_processed += 1;
        match outcome {
            TableOutcome::Matched => ctx.stats.tables_with_matches += 1,
            TableOutcome::NoMatches => ctx.stats.tables_without_matches += 1,
            TableOutcome::Errored => ctx.stats.tables_errored += 1,
        }

        progress.table_finished(&TableProgress {
            table: table.clone(),
            index: i + 1,
            total,
            outcome,
        });
    }

    ctx.log.info(format!(
        "Finished: {} field(s) {}, {} failed, {} skipped, {} row(s) affected",
        ctx.stats.fields_updated,
        if job.dry_run { "would be updated" } else { "updated" },
        ctx.stats.fields_failed,
        ctx.stats.fields_skipped,
        ctx.stats.rows_affected
    ));

    Ok(RunSummary {
        stats: ctx.stats,
        log: ctx.log,
    })
}

struct RunContext {
    stats: RunStats,
    log: RunLog,
}

async fn process_table<S: Store + ?Sized>(
    store: &mut S,
    job: &ReplacementJob,
    table: &str,
    ctx: &mut RunContext,
) -> TableOutcome {
    let columns = match inspect_table(store, table).await {
        Ok(columns) => columns,
        Err(e) => {
            ctx.log.error(e.to_string());
            return TableOutcome::Errored;
        }
    };
    debug!("Table {} has {} searchable column(s)", table, columns.len());

    let mut matched = false;
    for column in &columns {
        if process_column(store, job, table, column, ctx).await {
            matched = true;
        }
    }

    if matched {
        TableOutcome::Matched
    } else {
        TableOutcome::NoMatches
    }
}

/// Process one field. Returns whether the column had any match.
async fn process_column<S: Store + ?Sized>(
    store: &mut S,
    job: &ReplacementJob,
    table: &str,
    column: &ColumnDescriptor,
    ctx: &mut RunContext,
) -> bool {
    let field = format!("{table}.{}", column.name);

    let matches = match store.count_matches(table, &column.name, &job.search).await {
        Ok(n) => n,
        Err(e) => {
            ctx.log.error(format!("{field}: match scan failed: {e}"));
            ctx.stats.fields_failed += 1;
            return false;
        }
    };
    if matches == 0 {
        return false;
    }

    let (replacement, truncated) = match job.length_policy.decide(&job.replacement, column) {
        LengthDecision::Proceed(text) => (text, false),
        LengthDecision::Truncate(text) => {
            ctx.log.warning(format!(
                "{field}: replacement truncated to {} characters ('{text}')",
                column.max_length.unwrap_or_default()
            ));
            (text, true)
        }
        LengthDecision::Skip { length, max } => {
            ctx.log.warning(format!(
                "{field}: skipped, replacement is {length} characters but the column holds {max}"
            ));
            ctx.stats.fields_skipped += 1;
            return true;
        }
    };

    if job.dry_run {
        ctx.log.info(format!("{field}: would update {matches} row(s)"));
        ctx.stats.fields_updated += 1;
        ctx.stats.rows_affected += matches;
        if truncated {
            ctx.stats.fields_truncated += 1;
        }
        return true;
    }

    let mut rows = 0u64;
    let result = apply_replacement(store, job, table, column, &replacement, &mut rows).await;
    ctx.stats.rows_affected += rows;

    match result {
        Ok(()) => {
            ctx.stats.fields_updated += 1;
            if truncated {
                ctx.stats.fields_truncated += 1;
            }
            ctx.log.success(format!("{field}: updated {rows} row(s)"));
        }
        Err(e) => {
            ctx.stats.fields_failed += 1;
            if e.is_length_constraint() {
                ctx.log.error(format!("{field}: value does not fit the column: {e}"));
            } else {
                ctx.log.error(format!("{field}: update failed: {e}"));
            }
        }
    }
    true
}

/// Issue the writes for one field, adding every touched row to `rows` as it goes.
///
/// With serialized handling on, each matching value is rewritten on its own:
/// values that decode as serialized data only change through their string
/// leaves, everything else gets plain substring replacement. No value goes
/// through both.
async fn apply_replacement<S: Store + ?Sized>(
    store: &mut S,
    job: &ReplacementJob,
    table: &str,
    column: &ColumnDescriptor,
    replacement: &str,
    rows: &mut u64,
) -> Result<(), StoreError> {
    if !job.handle_serialized {
        *rows += store
            .replace_in_column(table, &column.name, &job.search, replacement)
            .await?;
        return Ok(());
    }

    let values = store
        .matching_values(table, &column.name, &job.search)
        .await?;
    let mut seen = HashSet::new();
    let mut rewrites = Vec::new();
    for old in values {
        if !seen.insert(old.clone()) {
            continue;
        }
        if let Some(new) = rewrite_value(&old, job.search.as_bytes(), replacement.as_bytes()) {
            rewrites.push((old, new));
        }
    }
    debug!(
        "{table}.{}: {} distinct value(s) to rewrite",
        column.name,
        rewrites.len()
    );

    for (old, new) in write_order(rewrites) {
        *rows += store.update_exact(table, &column.name, &old, &new).await?;
    }
    Ok(())
}

/// New contents for one matching value, or `None` when it stays as it is.
fn rewrite_value(old: &[u8], search: &[u8], replacement: &[u8]) -> Option<Vec<u8>> {
    if is_serialized(old) {
        match replace_serialized(old, search, replacement) {
            Replaced::Changed(new) => return Some(new),
            Replaced::Unchanged => return None,
            Replaced::NotSerialized => {}
        }
    }
    let new = replace_bytes(old, search, replacement);
    (new != old).then_some(new)
}

/// Order exact-value rewrites so none of them lands on a value a later one
/// still matches: when one rewrite produces another's original value, the
/// other is written first.
fn write_order(rewrites: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let order = {
        let by_old: HashMap<&[u8], usize> = rewrites
            .iter()
            .enumerate()
            .map(|(i, (old, _))| (old.as_slice(), i))
            .collect();
        let mut placed = vec![false; rewrites.len()];
        let mut order = Vec::with_capacity(rewrites.len());
        for start in 0..rewrites.len() {
            let mut chain = Vec::new();
            let mut current = start;
            while !placed[current] {
                placed[current] = true;
                chain.push(current);
                match by_old.get(rewrites[current].1.as_slice()) {
                    Some(&next) => current = next,
                    None => break,
                }
            }
            order.extend(chain.into_iter().rev());
        }
        order
    };

    let mut slots: Vec<Option<(Vec<u8>, Vec<u8>)>> = rewrites.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(old: &str, new: &str) -> (Vec<u8>, Vec<u8>) {
        (old.as_bytes().to_vec(), new.as_bytes().to_vec())
    }

    #[test]
    fn test_rewrite_value_serialized_and_plain() {
        assert_eq!(
            rewrite_value(br#"s:3:"abc";"#, b"abc", b"abcd"),
            Some(br#"s:4:"abcd";"#.to_vec())
        );
        assert_eq!(rewrite_value(b"abc abc", b"abc", b"x"), Some(b"x x".to_vec()));
        // integer leaf only
        assert_eq!(rewrite_value(br#"a:1:{s:2:"id";i:42;}"#, b"42", b"4200"), None);
        // serialized shape, wrong length
        assert_eq!(
            rewrite_value(br#"s:10:"hello";"#, b"hello", b"world"),
            Some(br#"s:10:"world";"#.to_vec())
        );
    }

    #[test]
    fn test_write_order_follows_chains() {
        let ordered = write_order(vec![pair("a", "aa"), pair("aa", "aaaa"), pair("b", "c")]);
        assert_eq!(
            ordered,
            vec![pair("aa", "aaaa"), pair("a", "aa"), pair("b", "c")]
        );
    }

    #[test]
    fn test_write_order_tolerates_cycles() {
        let ordered = write_order(vec![pair("ab", "ba"), pair("ba", "ab")]);
        assert_eq!(ordered.len(), 2);
    }
}
