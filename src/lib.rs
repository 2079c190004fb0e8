//! wp-dbtool library
//!
//! Command-line plumbing around the [`search_replace`] engine: connection
//! options, `wp-config.php` reading and run reports.
//!
//! # CLI Usage
//!
//! ```bash
//! # Preview a domain move, reading credentials from wp-config.php
//! wp-dbtool replace --wp-config ./wp-config.php \
//!   --search http://old.example --replace https://new.example --dry-run
//!
//! # Check that the database is reachable
//! WP_DB_USER=wp WP_DB_NAME=wordpress wp-dbtool test-connection
//!
//! # Rename tables from wp_ to site_
//! wp-dbtool change-prefix --wp-config ./wp-config.php --new-prefix site_
//! ```

use clap::{Parser, ValueEnum};
use search_replace::{ConnectionParams, LengthPolicy, ReplacementJob, TableSelection};
use std::path::PathBuf;

pub mod config;
pub mod report;

use config::{read_wp_config, WpConfig};

#[derive(Parser, Clone, Default)]
pub struct ConnectionOpts {
    /// Path to wp-config.php to read database settings from
    #[arg(long, env = "WP_CONFIG")]
    pub wp_config: Option<PathBuf>,

    /// Database host, optionally with :port or :/path/to/socket
    #[arg(long, env = "WP_DB_HOST")]
    pub db_host: Option<String>,

    /// Database port, used when the host does not carry one
    #[arg(long, env = "WP_DB_PORT")]
    pub db_port: Option<u16>,

    /// Database user
    #[arg(long, env = "WP_DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "WP_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database name
    #[arg(long, env = "WP_DB_NAME")]
    pub db_name: Option<String>,
}

impl ConnectionOpts {
    /// Settings from `--wp-config`, if one was given.
    pub fn load_wp_config(&self) -> anyhow::Result<Option<WpConfig>> {
        let Some(path) = &self.wp_config else {
            return Ok(None);
        };
        match read_wp_config(path)? {
            Some(config) => Ok(Some(config)),
            None => anyhow::bail!("wp-config file not found: {}", path.display()),
        }
    }

    /// Flags and environment first, then `--wp-config`.
    pub fn resolve(&self) -> anyhow::Result<ConnectionParams> {
        let from_file = self.load_wp_config()?.unwrap_or_default();
        self.as_wp_config().or(from_file).connection_params(self.db_port)
    }

    fn as_wp_config(&self) -> WpConfig {
        WpConfig {
            db_name: self.db_name.clone(),
            db_user: self.db_user.clone(),
            db_password: self.db_password.clone(),
            db_host: self.db_host.clone(),
            ..WpConfig::default()
        }
    }
}

/// Length policy as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthPolicyArg {
    /// Leave columns the replacement does not fit
    #[default]
    Skip,
    /// Cut the replacement to the column size
    Truncate,
    /// Write anyway and report the database's rejection
    Try,
}

impl From<LengthPolicyArg> for LengthPolicy {
    fn from(arg: LengthPolicyArg) -> Self {
        match arg {
            LengthPolicyArg::Skip => LengthPolicy::Skip,
            LengthPolicyArg::Truncate => LengthPolicy::Truncate,
            LengthPolicyArg::Try => LengthPolicy::Try,
        }
    }
}

#[derive(Parser, Clone)]
pub struct JobOpts {
    /// Text to search for (literal, case-sensitive)
    #[arg(long)]
    pub search: String,

    /// Replacement text
    #[arg(long = "replace")]
    pub replacement: String,

    /// Comma-separated table names, or "all"
    #[arg(long, default_value = "all")]
    pub tables: String,

    /// Treat serialized values as plain text
    #[arg(long)]
    pub no_serialized: bool,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// What to do when the replacement is longer than a column allows
    #[arg(long, value_enum, default_value_t = LengthPolicyArg::Skip)]
    pub length_policy: LengthPolicyArg,
}

impl JobOpts {
    pub fn to_job(&self) -> ReplacementJob {
        ReplacementJob::new(&self.search, &self.replacement)
            .with_tables(TableSelection::parse(&self.tables))
            .with_handle_serialized(!self.no_serialized)
            .with_dry_run(self.dry_run)
            .with_length_policy(self.length_policy.into())
    }
}
