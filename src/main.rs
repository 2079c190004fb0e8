//! Command-line interface for wp-dbtool
//!
//! # Usage Examples
//!
//! ## Search/replace
//! ```bash
//! # Move a site to a new domain, serialized values included
//! wp-dbtool replace --wp-config /var/www/wp-config.php \
//!   --search http://old.example --replace https://new.example
//!
//! # Preview only, on two tables, cutting replacements that do not fit
//! wp-dbtool replace --db-host localhost --db-user wp --db-name wordpress \
//!   --search foo --replace bar --tables wp_options,wp_posts \
//!   --length-policy truncate --dry-run
//! ```
//!
//! ## Table prefix
//! ```bash
//! wp-dbtool detect-prefix --wp-config /var/www/wp-config.php
//! wp-dbtool change-prefix --wp-config /var/www/wp-config.php --new-prefix site_
//! ```
//!
//! Connection settings come from flags, then `WP_DB_*` environment variables,
//! then `--wp-config`.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use search_replace::{
    change_prefix, detect_common_prefix, run_replacement, test_connection, MySqlStore, RunLog,
    Store, TableOutcome, TableProgress,
};
use serde::Serialize;
use std::path::PathBuf;
use wp_dbtool::config::switch_table_prefix;
use wp_dbtool::report::{RunReport, DEFAULT_LOG_DIR};
use wp_dbtool::{ConnectionOpts, JobOpts};

#[derive(Parser)]
#[command(name = "wp-dbtool")]
#[command(about = "Search/replace and table prefix tools for WordPress databases")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace text in every textual column, keeping serialized values valid
    Replace {
        #[command(flatten)]
        conn: ConnectionOpts,

        #[command(flatten)]
        job: JobOpts,

        /// Directory for the JSON report and text log
        #[arg(long, default_value = DEFAULT_LOG_DIR)]
        log_dir: PathBuf,
    },

    /// Check that the database is reachable and report its version
    TestConnection {
        #[command(flatten)]
        conn: ConnectionOpts,
    },

    /// Guess the table prefix from the table names
    DetectPrefix {
        #[command(flatten)]
        conn: ConnectionOpts,
    },

    /// Rename tables and prefixed keys to a new table prefix
    ChangePrefix {
        #[command(flatten)]
        conn: ConnectionOpts,

        /// Current prefix (default: $table_prefix from wp-config, else detected)
        #[arg(long)]
        old_prefix: Option<String>,

        /// New prefix
        #[arg(long)]
        new_prefix: String,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Leave $table_prefix in wp-config.php alone
        #[arg(long)]
        keep_wp_config: bool,

        /// Directory for the JSON report and text log
        #[arg(long, default_value = DEFAULT_LOG_DIR)]
        log_dir: PathBuf,
    },
}

#[derive(Serialize)]
struct PrefixJob {
    old_prefix: String,
    new_prefix: String,
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replace { conn, job, log_dir } => run_replace(conn, job, log_dir).await?,
        Commands::TestConnection { conn } => {
            let params = conn.resolve()?;
            let report = test_connection(&params).await?;
            println!(
                "Connected to {} (MySQL {}, {} tables)",
                params.display_target(),
                report.server_version,
                report.table_count
            );
        }
        Commands::DetectPrefix { conn } => {
            let params = conn.resolve()?;
            let mut store = MySqlStore::connect(&params).await?;
            let tables = store.list_tables().await;
            store.close().await;
            let tables = tables.context("Failed to list tables")?;

            match detect_common_prefix(&tables) {
                Some(prefix) => println!("{prefix}"),
                None => anyhow::bail!("No common prefix among {} table(s)", tables.len()),
            }
        }
        Commands::ChangePrefix {
            conn,
            old_prefix,
            new_prefix,
            dry_run,
            keep_wp_config,
            log_dir,
        } => {
            run_change_prefix(conn, old_prefix, new_prefix, dry_run, keep_wp_config, log_dir)
                .await?
        }
    }

    Ok(())
}

async fn run_replace(conn: ConnectionOpts, opts: JobOpts, log_dir: PathBuf) -> anyhow::Result<()> {
    let job = opts.to_job();
    job.validate()?;
    let params = conn.resolve()?;

    let started_at = Utc::now();
    let mut store = MySqlStore::connect(&params).await?;
    tracing::info!(
        "Connected to {} (sql_mode {})",
        params.display_target(),
        store.sql_mode()
    );

    let mut progress = |p: &TableProgress| {
        let outcome = match p.outcome {
            TableOutcome::Matched => "matches",
            TableOutcome::NoMatches => "no matches",
            TableOutcome::Errored => "error",
        };
        tracing::info!("[{}/{}] {} ({outcome})", p.index, p.total, p.table);
    };
    let result = run_replacement(&mut store, &job, &mut progress).await;
    store.close().await;
    let summary = result?;

    let report = RunReport {
        operation: "search_replace",
        job,
        stats: summary.stats,
        entries: summary.log.into_entries(),
        started_at,
        finished_at: Utc::now(),
    };
    let paths = report.write_to(&log_dir)?;

    println!("{}", report.stats);
    println!("Log: {}", paths.log.display());
    if !report.stats.is_clean() {
        tracing::warn!("Some tables or fields failed, see {}", paths.log.display());
    }
    Ok(())
}

async fn run_change_prefix(
    conn: ConnectionOpts,
    old_prefix: Option<String>,
    new_prefix: String,
    dry_run: bool,
    keep_wp_config: bool,
    log_dir: PathBuf,
) -> anyhow::Result<()> {
    let wp_config = conn.load_wp_config()?;
    let params = conn.resolve()?;

    let started_at = Utc::now();
    let mut store = MySqlStore::connect(&params).await?;

    let old_prefix = match old_prefix.or_else(|| wp_config.and_then(|c| c.table_prefix)) {
        Some(prefix) => prefix,
        None => {
            let tables = store.list_tables().await;
            let detected = tables.map(|t| detect_common_prefix(&t));
            match detected {
                Ok(Some(prefix)) => prefix,
                Ok(None) => {
                    store.close().await;
                    anyhow::bail!("Cannot detect the current prefix, pass --old-prefix");
                }
                Err(e) => {
                    store.close().await;
                    return Err(e).context("Failed to list tables");
                }
            }
        }
    };
    tracing::info!("Current prefix: {old_prefix}");

    let mut log = RunLog::new();
    let result = change_prefix(&mut store, &old_prefix, &new_prefix, dry_run, &mut log).await;
    store.close().await;
    let stats = result?;

    if let (Some(path), false, false) = (&conn.wp_config, dry_run, keep_wp_config) {
        match switch_table_prefix(path, &new_prefix, &stats) {
            Ok(true) => log.success(format!("Updated $table_prefix in {}", path.display())),
            Ok(false) => log.error(format!(
                "Left $table_prefix in {} unchanged: {} table(s) renamed, {} failed",
                path.display(),
                stats.tables_renamed,
                stats.tables_failed
            )),
            Err(e) => log.error(format!("{e:#}")),
        }
    }

    let report = RunReport {
        operation: "change_prefix",
        job: PrefixJob {
            old_prefix,
            new_prefix,
            dry_run,
        },
        stats,
        entries: log.into_entries(),
        started_at,
        finished_at: Utc::now(),
    };
    let paths = report.write_to(&log_dir)?;

    println!("{}", report.stats);
    println!("Log: {}", paths.log.display());
    Ok(())
}
