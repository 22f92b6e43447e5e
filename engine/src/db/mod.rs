//! Read-only access to the basketball statistics database
//!
//! The database is produced elsewhere; this module only inspects and queries
//! it. The file is opened with `mode=ro` and every agent-issued statement is
//! checked by [`SqlGuard`] first.

use futures::TryStreamExt;
use sdk::errors::EngineError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Row, TypeInfo, ValueRef};
use std::path::Path;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

pub mod guard;

pub use guard::SqlGuard;

/// Sample rows included with each table's schema
const SAMPLE_ROWS: usize = 3;

/// Returned in place of an empty result set
pub const NO_ROWS: &str = "(no rows)";

/// Statistics database handle
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    max_rows: usize,
}

impl Database {
    /// Open an existing statistics database read-only.
    ///
    /// Fails if the file is missing; it is never created here.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, EngineError> {
        let path = config.path.as_path();
        info!("Opening statistics database at: {}", path.display());

        if !path.exists() {
            return Err(EngineError::Database(format!(
                "Database file not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| EngineError::Database(format!("Failed to open database: {}", e)))?;

        debug!("Database connection established");

        Ok(Self::from_pool(pool, config.max_rows))
    }

    /// Wrap an existing pool. The caller is responsible for it being read-only.
    pub fn from_pool(pool: SqlitePool, max_rows: usize) -> Self {
        Self { pool, max_rows }
    }

    /// Path-only convenience used by the CLI and tests
    pub async fn open_path(path: &Path, max_rows: usize) -> Result<Self, EngineError> {
        let config = DatabaseConfig {
            path: path.to_path_buf(),
            max_rows,
            ..DatabaseConfig::default()
        };
        Self::open(&config).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Names of the user tables, sorted
    pub async fn usable_table_names(&self) -> Result<Vec<String>, EngineError> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(db_error))
            .collect()
    }

    /// CREATE statements plus a few sample rows for each named table.
    ///
    /// `None` describes every usable table. Unknown names are reported
    /// together in one error.
    pub async fn table_info(&self, table_names: Option<&[String]>) -> Result<String, EngineError> {
        let known = self.usable_table_names().await?;
        let table_names = table_names.unwrap_or(known.as_slice());

        let missing: Vec<&str> = table_names
            .iter()
            .filter(|name| !known.iter().any(|k| k == name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::Database(format!(
                "Tables not found in database: {}",
                missing.join(", ")
            )));
        }

        let mut sections = Vec::with_capacity(table_names.len());
        for name in table_names {
            let create: String =
                sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_error)?;

            let sample_sql = format!(
                "SELECT * FROM {} LIMIT {}",
                quote_identifier(name),
                SAMPLE_ROWS
            );
            let rows = sqlx::query(&sample_sql)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

            sections.push(format!(
                "{}\n\n/*\n{} rows from {} table:\n{}*/",
                create.trim(),
                SAMPLE_ROWS,
                name,
                render_rows(&rows, SAMPLE_ROWS)
            ));
        }

        Ok(sections.join("\n\n"))
    }

    /// Run one read-only statement and render the result as text.
    ///
    /// The first line holds column names, one row per following line, values
    /// tab-separated. At most `max_rows` rows are rendered. An empty result is
    /// rendered as [`NO_ROWS`].
    ///
    /// Rows are streamed. Only the first `max_rows` are kept, the rest are
    /// just counted.
    pub async fn run_query(&self, sql: &str) -> Result<String, EngineError> {
        SqlGuard::validate(sql)?;

        debug!(sql, "Running agent query");
        let mut stream = sqlx::query(sql).fetch(&self.pool);
        let mut rows = Vec::new();
        let mut hidden = 0usize;
        while let Some(row) = stream.try_next().await.map_err(db_error)? {
            if rows.len() < self.max_rows {
                rows.push(row);
            } else {
                hidden += 1;
            }
        }

        if rows.is_empty() {
            return Ok(NO_ROWS.to_string());
        }

        let mut rendered = render_rows(&rows, self.max_rows);
        if hidden > 0 {
            rendered.push_str(&format!("... ({} more rows not shown)\n", hidden));
        }
        Ok(rendered)
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn db_error(e: sqlx::Error) -> EngineError {
    EngineError::Database(e.to_string())
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Header line plus up to `limit` rows, each terminated by a newline.
fn render_rows(rows: &[SqliteRow], limit: usize) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut out = first
        .columns()
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join("\t");
    out.push('\n');

    for row in rows.iter().take(limit) {
        let values: Vec<String> = (0..row.columns().len())
            .map(|i| render_value(row, i))
            .collect();
        out.push_str(&values.join("\t"));
        out.push('\n');
    }

    out
}

/// Render a single cell according to its runtime storage class.
fn render_value(row: &SqliteRow, index: usize) -> String {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return "NULL".to_string(),
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return "?".to_string(),
    };

    match storage.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "INT8" | "BOOLEAN" => row
            .try_get_unchecked::<i64, _>(index)
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
            .try_get_unchecked::<f64, _>(index)
            .map(|v| v.to_string())
            .unwrap_or_default(),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|v| format!("<{} bytes>", v.len()))
            .unwrap_or_default(),
        _ => row
            .try_get_unchecked::<String, _>(index)
            .unwrap_or_default(),
    }
}
