//! Search/replace engine for WordPress databases.
//!
//! This crate walks every textual column of the selected tables and replaces
//! a literal substring, keeping PHP serialized values readable by rewriting
//! them through [`php_serialize`]. It also provides:
//!
//! - [`Store`] - the database seam, with [`MySqlStore`] for live servers and
//!   [`testing::MemoryStore`] for tests
//! - [`schema`] - column classification and capacities
//! - [`LengthPolicy`] - what to do when a replacement outgrows a column
//! - [`prefix`] - table prefix detection and renaming
//! - [`test_connection`] - a reachability probe
//!
//! # Architecture
//!
//! ```text
//! run_replacement
//!    │
//!    ├─── schema::inspect_table   (which columns, how long)
//!    ├─── LengthPolicy::decide    (once per column)
//!    ├─── php_serialize           (per-value rewrite, exact-value updates)
//!    └─── Store::replace_in_column (column-wide REPLACE, serialized handling off)
//! ```
//!
//! # Example
//!
//! ```rust
//! use search_replace::testing::MemoryStore;
//! use search_replace::{run_replacement, ReplacementJob, TableProgress};
//!
//! # tokio_test_block(async {
//! let mut store = MemoryStore::new()
//!     .with_table("wp_options", &[("option_value", "longtext")])
//!     .with_row("wp_options", &[Some(r#"a:1:{s:3:"url";s:11:"old.example";}"#)]);
//!
//! let job = ReplacementJob::new("old.example", "new.example.org");
//! let summary = run_replacement(&mut store, &job, &mut |_: &TableProgress| {})
//!     .await
//!     .unwrap();
//!
//! assert_eq!(summary.stats.rows_affected, 1);
//! assert_eq!(
//!     store.column_values("wp_options", "option_value")[0].as_deref(),
//!     Some(r#"a:1:{s:3:"url";s:15:"new.example.org";}"#)
//! );
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod error;
pub mod executor;
pub mod job;
pub mod length_policy;
pub mod log;
pub mod mysql;
pub mod prefix;
pub mod schema;
pub mod stats;
pub mod store;
pub mod testing;

pub use error::{ConnectionError, JobError, PrefixError, SchemaError, StoreError};
pub use executor::{run_replacement, Progress, RunSummary, TableOutcome, TableProgress};
pub use job::{ReplacementJob, TableSelection};
pub use length_policy::{LengthDecision, LengthPolicy};
pub use log::{LogEntry, LogLevel, RunLog};
pub use mysql::{probe, test_connection, ConnectionParams, ConnectionReport, Endpoint, MySqlStore};
pub use prefix::{change_prefix, detect_common_prefix, validate_prefix, PrefixChangeStats};
pub use schema::{classify_column, ColumnDescriptor, ColumnKind};
pub use stats::RunStats;
pub use store::{RawColumn, Store};
