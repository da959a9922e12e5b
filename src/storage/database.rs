//! Relational persistence gateway.
//!
//! A [`Database`] owns at most one `sqlx` [`AnyConnection`]. The connection
//! is opened on first use, re-opened when a health check fails, and
//! released by [`Database::close`]. Callers pass the gateway by `&mut`, so
//! there is no pooling and no locking.

use serde::Serialize;
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, Column, Connection, Row, ValueRef};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Once;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Row limit applied when a select does not specify one.
pub const DEFAULT_SELECT_LIMIT: u64 = 300;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The connection URL has an unsupported scheme.
    #[error("Unsupported database URL '{0}': expected sqlite:, mysql: or postgres:")]
    InvalidUrl(String),

    /// Connection to the database failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// A table or column name is not a plain SQL identifier.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Insert called without any column.
    #[error("Record for table '{0}' has no columns")]
    EmptyRecord(String),

    /// A row could not be mapped onto a typed record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// SQL dialect, derived from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    Sqlite,
    MySql,
    Postgres,
}

impl DbBackend {
    /// Detect the dialect of a connection URL.
    pub fn from_url(url: &str) -> Result<Self, DatabaseError> {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "sqlite" => Ok(DbBackend::Sqlite),
            "mysql" | "mariadb" => Ok(DbBackend::MySql),
            "postgres" | "postgresql" => Ok(DbBackend::Postgres),
            _ => Err(DatabaseError::InvalidUrl(redact_url(url))),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DbBackend::Postgres => format!("${}", index),
            DbBackend::Sqlite | DbBackend::MySql => "?".to_string(),
        }
    }
}

impl fmt::Display for DbBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbBackend::Sqlite => write!(f, "sqlite"),
            DbBackend::MySql => write!(f, "mysql"),
            DbBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Column name to value.
pub type Record = BTreeMap<String, SqlValue>;

/// Parameters of a generic select.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    /// Plain column names or `column AS alias`; empty selects all columns.
    pub columns: Vec<String>,
    /// Equality filters, joined with `AND`.
    pub filters: Vec<(String, SqlValue)>,
    pub limit: u64,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            limit: DEFAULT_SELECT_LIMIT,
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Render the statement for `backend`. Identifiers are validated here.
    pub fn to_sql(&self, backend: DbBackend) -> Result<String, DatabaseError> {
        validate_identifier(&self.table)?;

        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|column| render_column(column))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", projection, self.table);

        if !self.filters.is_empty() {
            let clauses = self
                .filters
                .iter()
                .enumerate()
                .map(|(i, (column, _))| {
                    validate_identifier(column)?;
                    Ok(format!("{} = {}", column, backend.placeholder(i + 1)))
                })
                .collect::<Result<Vec<_>, DatabaseError>>()?;
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(&format!(" LIMIT {}", self.limit));
        Ok(sql)
    }
}

/// Render an `INSERT` for `table` with the columns of `record`, in key order.
pub fn insert_sql(
    backend: DbBackend,
    table: &str,
    record: &Record,
) -> Result<String, DatabaseError> {
    validate_identifier(table)?;
    if record.is_empty() {
        return Err(DatabaseError::EmptyRecord(table.to_string()));
    }

    for column in record.keys() {
        validate_identifier(column)?;
    }

    let columns: Vec<&str> = record.keys().map(String::as_str).collect();
    let placeholders: Vec<String> = (1..=record.len()).map(|i| backend.placeholder(i)).collect();

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    ))
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<(), DatabaseError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate `column` or `column AS alias`.
fn render_column(column_spec: &str) -> Result<String, DatabaseError> {
    let parts: Vec<&str> = column_spec.split_whitespace().collect();
    match parts.as_slice() {
        [column] => {
            validate_identifier(column)?;
            Ok(column.to_string())
        }
        [column, keyword, alias] if keyword.eq_ignore_ascii_case("as") => {
            validate_identifier(column)?;
            validate_identifier(alias)?;
            Ok(format!("{} AS {}", column, alias))
        }
        _ => Err(DatabaseError::InvalidIdentifier(column_spec.to_string())),
    }
}

/// Hide credentials in a URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
}

/// Persistence gateway over a single lazily-opened connection.
pub struct Database {
    url: String,
    backend: DbBackend,
    conn: Option<AnyConnection>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("url", &redact_url(&self.url))
            .field("backend", &self.backend)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl Database {
    /// Create a gateway for `url` without connecting.
    pub fn new(url: impl Into<String>) -> Result<Self, DatabaseError> {
        let url = url.into();
        let backend = DbBackend::from_url(&url)?;
        Ok(Self {
            url,
            backend,
            conn: None,
        })
    }

    pub fn backend(&self) -> DbBackend {
        self.backend
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Return the live connection, opening or re-opening it as needed.
    async fn connection(&mut self) -> Result<&mut AnyConnection, DatabaseError> {
        let healthy = match self.conn.as_mut() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        };

        if !healthy {
            if self.conn.take().is_some() {
                warn!(backend = %self.backend, "Database connection lost, reconnecting");
            }
            install_drivers();
            let conn = AnyConnection::connect(&self.url)
                .await
                .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            debug!(backend = %self.backend, url = %redact_url(&self.url), "Database connection opened");
            self.conn = Some(conn);
        }

        self.conn
            .as_mut()
            .ok_or_else(|| DatabaseError::ConnectionFailed("connection unavailable".to_string()))
    }

    /// Release the connection. Safe to call when not connected.
    pub async fn close(&mut self) -> Result<(), DatabaseError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!(backend = %self.backend, "Database connection closed");
        }
        Ok(())
    }

    /// Run a statement without parameters.
    pub async fn execute_raw(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        let conn = self.connection().await?;
        let result = sqlx::query::<Any>(sql).execute(conn).await?;
        Ok(result.rows_affected())
    }

    /// Insert one row; returns the number of affected rows.
    pub async fn insert(&mut self, table: &str, record: &Record) -> Result<u64, DatabaseError> {
        let sql = insert_sql(self.backend, table, record)?;
        let conn = self.connection().await?;

        let mut query = sqlx::query::<Any>(&sql);
        for value in record.values() {
            query = bind_value(query, value);
        }

        let result = query.execute(conn).await?;
        info!(table = %table, rows = result.rows_affected(), "Inserted record");
        Ok(result.rows_affected())
    }

    /// Select rows as column-name keyed records.
    pub async fn select(&mut self, query: &SelectQuery) -> Result<Vec<Record>, DatabaseError> {
        let sql = query.to_sql(self.backend)?;
        let conn = self.connection().await?;

        let mut statement = sqlx::query::<Any>(&sql);
        for (_, value) in &query.filters {
            statement = bind_value(statement, value);
        }

        let rows = statement.fetch_all(conn).await?;
        debug!(table = %query.table, rows = rows.len(), "Selected records");
        rows.iter().map(row_to_record).collect()
    }
}

type AnyQuery<'q> = sqlx::query::Query<'q, Any, sqlx::any::AnyArguments<'q>>;

fn bind_value<'q>(query: AnyQuery<'q>, value: &SqlValue) -> AnyQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
    }
}

fn row_to_record(row: &AnyRow) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = decode_value(row, index).ok_or_else(|| {
            DatabaseError::InvalidRecord(format!(
                "column '{}' has a type that cannot be read",
                column.name()
            ))
        })?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_value(row: &AnyRow, index: usize) -> Option<SqlValue> {
    // A NULL carries no type information through the `any` driver.
    if row.try_get_raw(index).ok()?.is_null() {
        return Some(SqlValue::Null);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Some(value.into());
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return Some(value.map(i64::from).into());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Some(value.into());
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Some(value.into());
    }
    None
}
