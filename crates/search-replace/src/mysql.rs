//! MySQL/MariaDB backend.
//!
//! A `MySqlStore` owns one connection for the lifetime of a run. Containment
//! checks use `LOCATE(?, BINARY col) > 0`, which is case-sensitive and treats
//! the search text literally (no `LIKE` wildcards to escape).

use crate::error::{ConnectionError, StoreError};
use crate::store::{RawColumn, Store};
use async_trait::async_trait;
use mysql_async::{prelude::*, Conn, OptsBuilder, Pool, Value};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// MySQL error code for `Data too long for column`.
const ER_DATA_TOO_LONG: u16 = 1406;

pub const DEFAULT_PORT: u16 = 3306;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Socket { path: String },
}

impl Endpoint {
    /// Parse a WordPress-style `DB_HOST` value.
    ///
    /// Accepts `host`, `host:port`, `host:/path/to.sock`, `/path/to.sock` and
    /// bracketed IPv6 such as `[::1]:3307`.
    pub fn parse(db_host: &str, default_port: u16) -> Self {
        let db_host = db_host.trim();
        if db_host.starts_with('/') {
            return Endpoint::Socket {
                path: db_host.to_string(),
            };
        }
        if let Some(rest) = db_host.strip_prefix('[') {
            if let Some((host, tail)) = rest.split_once(']') {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(default_port);
                return Endpoint::Tcp {
                    host: host.to_string(),
                    port,
                };
            }
        }
        match db_host.rsplit_once(':') {
            Some((_, tail)) if tail.starts_with('/') => Endpoint::Socket {
                path: tail.to_string(),
            },
            Some((host, tail)) if !host.contains(':') => match tail.parse::<u16>() {
                Ok(port) => Endpoint::Tcp {
                    host: host.to_string(),
                    port,
                },
                Err(_) => Endpoint::Tcp {
                    host: host.to_string(),
                    port: default_port,
                },
            },
            _ => Endpoint::Tcp {
                host: if db_host.is_empty() {
                    "localhost".to_string()
                } else {
                    db_host.to_string()
                },
                port: default_port,
            },
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{host}:{port}"),
            Endpoint::Socket { path } => write!(f, "unix:{path}"),
        }
    }
}

/// Credentials and location of the database.
#[derive(Clone)]
pub struct ConnectionParams {
    pub endpoint: Endpoint,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionParams {
    /// Connection target for logs and errors, without the password.
    pub fn display_target(&self) -> String {
        format!("{}@{}/{}", self.user, self.endpoint, self.database)
    }

    fn to_opts(&self) -> OptsBuilder {
        let builder = OptsBuilder::default()
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()));
        match &self.endpoint {
            Endpoint::Tcp { host, port } => builder.ip_or_hostname(host.clone()).tcp_port(*port),
            Endpoint::Socket { path } => builder.socket(Some(path.clone())),
        }
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Answer of a connection test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub reachable: bool,
    pub table_count: usize,
    pub server_version: String,
}

/// Connect, report reachability, table count and server version, disconnect.
pub async fn test_connection(
    params: &ConnectionParams,
) -> Result<ConnectionReport, ConnectionError> {
    let mut store = MySqlStore::connect(params).await?;
    let result = probe(&mut store).await;
    store.close().await;
    result.map_err(|source| ConnectionError::Probe {
        target: params.display_target(),
        source,
    })
}

/// Gather a [`ConnectionReport`] from any store.
pub async fn probe<S: Store + ?Sized>(store: &mut S) -> Result<ConnectionReport, StoreError> {
    let server_version = store.server_version().await?;
    let table_count = store.list_tables().await?.len();
    Ok(ConnectionReport {
        reachable: true,
        table_count,
        server_version,
    })
}

/// A single MySQL connection owned by one run.
pub struct MySqlStore {
    pool: Pool,
    conn: Conn,
    database: String,
    sql_mode: String,
}

impl MySqlStore {
    /// Open the connection. Fails with [`ConnectionError`] when the server is
    /// unreachable, the credentials are rejected or the database is missing.
    pub async fn connect(params: &ConnectionParams) -> Result<Self, ConnectionError> {
        let target = params.display_target();
        let pool = Pool::new(params.to_opts());

        let mut conn = match pool.get_conn().await {
            Ok(conn) => conn,
            Err(e) => {
                if let Err(err) = pool.disconnect().await {
                    debug!("Error while disconnecting pool: {err}");
                }
                return Err(ConnectionError::Connect {
                    target,
                    message: e.to_string(),
                });
            }
        };

        let database: Option<String> = conn
            .query_first("SELECT DATABASE()")
            .await
            .map_err(|e| ConnectionError::Connect {
                target: target.clone(),
                message: e.to_string(),
            })?;
        let database = database.ok_or(ConnectionError::NoDatabase(target.clone()))?;

        // Oversized writes must fail with 1406, not be truncated with a warning.
        let strict = conn
            .query_drop(
                "SET SESSION sql_mode = CONCAT_WS(',', NULLIF(@@SESSION.sql_mode, ''), 'STRICT_ALL_TABLES')",
            )
            .await;
        let sql_mode: Result<Option<String>, _> = match strict {
            Ok(()) => conn.query_first("SELECT @@SESSION.sql_mode").await,
            Err(e) => Err(e),
        };
        let sql_mode = match sql_mode {
            Ok(mode) => mode.unwrap_or_default(),
            Err(e) => {
                if let Err(err) = conn.disconnect().await {
                    debug!("Error while closing MySQL connection: {err}");
                }
                if let Err(err) = pool.disconnect().await {
                    debug!("Error while disconnecting pool: {err}");
                }
                return Err(ConnectionError::Connect {
                    target,
                    message: format!("Failed to enable strict SQL mode: {e}"),
                });
            }
        };
        debug!("Session sql_mode: {sql_mode}");

        info!("Connected to MySQL database {database} at {target}");
        Ok(Self {
            pool,
            conn,
            database,
            sql_mode,
        })
    }

    /// Session `sql_mode` after connecting; always includes `STRICT_ALL_TABLES`.
    pub fn sql_mode(&self) -> &str {
        &self.sql_mode
    }

    /// Release the connection and the pool.
    pub async fn close(self) {
        let MySqlStore { pool, conn, .. } = self;
        if let Err(e) = conn.disconnect().await {
            warn!("Error while closing MySQL connection: {e}");
        }
        if let Err(e) = pool.disconnect().await {
            warn!("Error while disconnecting MySQL pool: {e}");
        }
    }
}

/// Backtick-quote an identifier, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

impl From<mysql_async::Error> for StoreError {
    fn from(e: mysql_async::Error) -> Self {
        match &e {
            mysql_async::Error::Server(server) if server.code == ER_DATA_TOO_LONG => {
                StoreError::LengthConstraint(server.message.clone())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn list_tables(&mut self) -> Result<Vec<String>, StoreError> {
        let query = "
            SELECT TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ?
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        ";
        let tables: Vec<String> = self.conn.exec(query, (self.database.clone(),)).await?;
        Ok(tables)
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<RawColumn>, StoreError> {
        let query = "
            SELECT COLUMN_NAME, COLUMN_TYPE
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        ";
        let rows: Vec<(String, String)> = self
            .conn
            .exec(query, (self.database.clone(), table.to_string()))
            .await?;
        if rows.is_empty() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        Ok(rows
            .into_iter()
            .map(|(name, column_type)| RawColumn { name, column_type })
            .collect())
    }

    async fn count_matches(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
    ) -> Result<u64, StoreError> {
        let col = quote_identifier(column);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE LOCATE(?, BINARY {col}) > 0",
            quote_identifier(table)
        );
        let count: Option<u64> = self.conn.exec_first(sql, (search.to_string(),)).await?;
        Ok(count.unwrap_or(0))
    }

    async fn matching_values(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let col = quote_identifier(column);
        let sql = format!(
            "SELECT {col} FROM {} WHERE LOCATE(?, BINARY {col}) > 0",
            quote_identifier(table)
        );
        let values: Vec<Option<Vec<u8>>> = self.conn.exec(sql, (search.to_string(),)).await?;
        Ok(values.into_iter().flatten().collect())
    }

    async fn update_exact(
        &mut self,
        table: &str,
        column: &str,
        old: &[u8],
        new: &[u8],
    ) -> Result<u64, StoreError> {
        let col = quote_identifier(column);
        let sql = format!(
            "UPDATE {} SET {col} = ? WHERE BINARY {col} = ?",
            quote_identifier(table)
        );
        self.conn
            .exec_drop(sql, (Value::Bytes(new.to_vec()), Value::Bytes(old.to_vec())))
            .await?;
        Ok(self.conn.affected_rows())
    }

    async fn replace_in_column(
        &mut self,
        table: &str,
        column: &str,
        search: &str,
        replacement: &str,
    ) -> Result<u64, StoreError> {
        let col = quote_identifier(column);
        let sql = format!(
            "UPDATE {} SET {col} = REPLACE({col}, ?, ?) WHERE LOCATE(?, BINARY {col}) > 0",
            quote_identifier(table)
        );
        self.conn
            .exec_drop(
                sql,
                (
                    search.to_string(),
                    replacement.to_string(),
                    search.to_string(),
                ),
            )
            .await?;
        Ok(self.conn.affected_rows())
    }

    async fn server_version(&mut self) -> Result<String, StoreError> {
        let version: Option<String> = self.conn.query_first("SELECT VERSION()").await?;
        Ok(version.unwrap_or_default())
    }

    async fn rename_table(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        let sql = format!(
            "RENAME TABLE {} TO {}",
            quote_identifier(from),
            quote_identifier(to)
        );
        self.conn.query_drop(sql).await?;
        Ok(())
    }

    async fn rewrite_key_prefix(
        &mut self,
        table: &str,
        column: &str,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<u64, StoreError> {
        let col = quote_identifier(column);
        let old_len = old_prefix.chars().count() as u64;
        let sql = format!(
            "UPDATE {} SET {col} = CONCAT(?, SUBSTRING({col}, ?)) WHERE BINARY LEFT({col}, ?) = ?",
            quote_identifier(table)
        );
        self.conn
            .exec_drop(
                sql,
                (
                    new_prefix.to_string(),
                    old_len + 1,
                    old_len,
                    old_prefix.to_string(),
                ),
            )
            .await?;
        Ok(self.conn.affected_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_plain_host() {
        assert_eq!(
            Endpoint::parse("localhost", DEFAULT_PORT),
            Endpoint::Tcp {
                host: "localhost".to_string(),
                port: 3306
            }
        );
        assert_eq!(
            Endpoint::parse("", DEFAULT_PORT),
            Endpoint::Tcp {
                host: "localhost".to_string(),
                port: 3306
            }
        );
    }

    #[test]
    fn test_endpoint_host_and_port() {
        assert_eq!(
            Endpoint::parse("db.example.com:3307", DEFAULT_PORT),
            Endpoint::Tcp {
                host: "db.example.com".to_string(),
                port: 3307
            }
        );
        assert_eq!(
            Endpoint::parse("[::1]:3308", DEFAULT_PORT),
            Endpoint::Tcp {
                host: "::1".to_string(),
                port: 3308
            }
        );
    }

    #[test]
    fn test_endpoint_socket() {
        assert_eq!(
            Endpoint::parse("localhost:/var/run/mysqld/mysqld.sock", DEFAULT_PORT),
            Endpoint::Socket {
                path: "/var/run/mysqld/mysqld.sock".to_string()
            }
        );
        assert_eq!(
            Endpoint::parse("/tmp/mysql.sock", DEFAULT_PORT),
            Endpoint::Socket {
                path: "/tmp/mysql.sock".to_string()
            }
        );
    }

    #[test]
    fn test_display_target_hides_password() {
        let params = ConnectionParams {
            endpoint: Endpoint::parse("localhost", DEFAULT_PORT),
            user: "wp".to_string(),
            password: "s3cret".to_string(),
            database: "wordpress".to_string(),
        };
        assert_eq!(params.display_target(), "wp@localhost:3306/wordpress");
        assert!(!format!("{params:?}").contains("s3cret"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("wp_posts"), "`wp_posts`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }
}
