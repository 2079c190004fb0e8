//! `wp-config.php` reader.
//!
//! Values are pulled out of the file text with patterns; the PHP is never
//! evaluated. Only literal `define('NAME', 'value')` calls and a literal
//! `$table_prefix = '...';` assignment are understood.

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use search_replace::mysql::DEFAULT_PORT;
use search_replace::{ConnectionParams, Endpoint, PrefixChangeStats};
use std::path::Path;

static DEFINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"define\s*\(\s*['"]([A-Z_]+)['"]\s*,\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*\)"#,
    )
    .expect("valid define pattern")
});

static TABLE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\$table_prefix\s*=\s*)(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")(\s*;)"#)
        .expect("valid table prefix pattern")
});

/// Database settings found in a `wp-config.php`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct WpConfig {
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_host: Option<String>,
    pub db_charset: Option<String>,
    pub table_prefix: Option<String>,
}

impl std::fmt::Debug for WpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WpConfig")
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &self.db_password.as_ref().map(|_| "***"))
            .field("db_host", &self.db_host)
            .field("db_charset", &self.db_charset)
            .field("table_prefix", &self.table_prefix)
            .finish()
    }
}

impl WpConfig {
    /// Extract settings from the text of a `wp-config.php`.
    pub fn parse(contents: &str) -> Self {
        let mut config = WpConfig::default();

        for line in contents.lines().filter(|l| !is_comment(l)) {
            for caps in DEFINE_RE.captures_iter(line) {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .map(|m| unescape(m.as_str()))
                    .unwrap_or_default();
                let slot = match &caps[1] {
                    "DB_NAME" => &mut config.db_name,
                    "DB_USER" => &mut config.db_user,
                    "DB_PASSWORD" => &mut config.db_password,
                    "DB_HOST" => &mut config.db_host,
                    "DB_CHARSET" => &mut config.db_charset,
                    _ => continue,
                };
                slot.get_or_insert(value);
            }

            if config.table_prefix.is_none() {
                if let Some(caps) = TABLE_PREFIX_RE.captures(line) {
                    config.table_prefix = caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .map(|m| unescape(m.as_str()));
                }
            }
        }

        config
    }

    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: WpConfig) -> WpConfig {
        WpConfig {
            db_name: self.db_name.or(fallback.db_name),
            db_user: self.db_user.or(fallback.db_user),
            db_password: self.db_password.or(fallback.db_password),
            db_host: self.db_host.or(fallback.db_host),
            db_charset: self.db_charset.or(fallback.db_charset),
            table_prefix: self.table_prefix.or(fallback.table_prefix),
        }
    }

    /// Build connection parameters.
    ///
    /// A port embedded in `DB_HOST` wins over `port`; without either the
    /// MySQL default is used. A missing host means `localhost`.
    pub fn connection_params(&self, port: Option<u16>) -> anyhow::Result<ConnectionParams> {
        let database = self
            .db_name
            .clone()
            .context("Database name is not set (use --db-name, WP_DB_NAME or DB_NAME in wp-config.php)")?;
        let user = self
            .db_user
            .clone()
            .context("Database user is not set (use --db-user, WP_DB_USER or DB_USER in wp-config.php)")?;

        Ok(ConnectionParams {
            endpoint: Endpoint::parse(
                self.db_host.as_deref().unwrap_or("localhost"),
                port.unwrap_or(DEFAULT_PORT),
            ),
            user,
            password: self.db_password.clone().unwrap_or_default(),
            database,
        })
    }
}

fn is_comment(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("//") || line.starts_with('#') || line.starts_with("/*") || line.starts_with('*')
}

/// Undo PHP quote escaping: `\'`, `\"` and `\\`.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('\'' | '"' | '\\')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Read and parse `path`. A missing file is `Ok(None)`.
pub fn read_wp_config(path: &Path) -> anyhow::Result<Option<WpConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(WpConfig::parse(&contents)))
}

/// Replace the `$table_prefix` value in `contents`.
///
/// Returns `None` when the file has no literal `$table_prefix` assignment.
pub fn rewrite_table_prefix(contents: &str, new_prefix: &str) -> Option<String> {
    let caps = TABLE_PREFIX_RE.captures(contents)?;
    let whole = caps.get(0)?;
    let replacement = format!("{}'{}'{}", &caps[1], new_prefix, &caps[4]);

    let mut out = String::with_capacity(contents.len() + new_prefix.len());
    out.push_str(&contents[..whole.start()]);
    out.push_str(&replacement);
    out.push_str(&contents[whole.end()..]);
    Some(out)
}

/// Rewrite `$table_prefix` in the file at `path` in place.
pub fn write_table_prefix(path: &Path, new_prefix: &str) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let updated = rewrite_table_prefix(&contents, new_prefix)
        .with_context(|| format!("No $table_prefix assignment found in {}", path.display()))?;
    std::fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))
}

/// Point the file at `new_prefix` after a prefix change, but only when every
/// table was renamed. Returns whether the file was rewritten.
pub fn switch_table_prefix(
    path: &Path,
    new_prefix: &str,
    stats: &PrefixChangeStats,
) -> anyhow::Result<bool> {
    if stats.dry_run || !stats.all_tables_renamed() {
        return Ok(false);
    }
    write_table_prefix(path, new_prefix)?;
    Ok(true)
}
