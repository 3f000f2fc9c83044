//! Type definitions for gate results and database metadata

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::sync::Arc;

/// Database type for SQL dialect-specific handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    Postgres,
    MySQL,
    MariaDB,
    SQLite,
}

impl DatabaseType {
    /// Detect database type from connection URL scheme
    ///
    /// # Examples
    /// ```
    /// # use readonly_sql_gate::types::DatabaseType;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = DatabaseType::from_url("postgres://localhost/mydb")?;
    /// assert_eq!(db, DatabaseType::Postgres);
    /// let db = DatabaseType::from_url("sqlite::memory:")?;
    /// assert_eq!(db, DatabaseType::SQLite);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_url(url: &str) -> Result<Self, crate::error::GateError> {
        let scheme = url.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default();
        Self::from_scheme(scheme).ok_or_else(|| {
            crate::error::GateError::Configuration(format!(
                "Cannot determine database type from URL scheme: {}",
                scheme
            ))
        })
    }

    /// Database type for a URL scheme, case-insensitive
    ///
    /// Only schemes the sqlx `Any` driver can connect with are recognized.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" => Some(Self::MySQL),
            "mariadb" => Some(Self::MariaDB),
            "sqlite" => Some(Self::SQLite),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "PostgreSQL"),
            Self::MySQL => write!(f, "MySQL"),
            Self::MariaDB => write!(f, "MariaDB"),
            Self::SQLite => write!(f, "SQLite"),
        }
    }
}

/// A single normalized column value.
///
/// Closed set of transport-stable shapes. Binary columns arrive here already
/// converted to text (lossy for non-UTF-8 bytes).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Byte sequence rendered as text
    Binary(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One result row: ordered column name to value mapping.
///
/// All rows of a [`QueryResult`] share the same column list, so column order is
/// identical across rows by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl ResultRow {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Value for a column name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Column names in engine order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in engine column order
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Iterate `(column, value)` pairs in engine column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

// Serialized as a JSON object whose keys keep engine column order.
impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// SQL query execution result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names in engine order (empty when no rows were returned)
    columns: Vec<String>,

    /// Result rows
    rows: Vec<ResultRow>,

    /// Number of rows in `rows`
    row_count: usize,

    /// Whether the configured row cap cut the result short
    truncated: bool,
}

impl QueryResult {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<ResultRow>, truncated: bool) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            truncated,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Human-readable one-line summary for the calling agent
    pub fn summary(&self) -> String {
        let mut text = if self.row_count == 0 {
            "Query executed successfully. Result: 0 rows.".to_string()
        } else {
            format!(
                "Query executed successfully. Returned {} row{}.",
                self.row_count,
                if self.row_count == 1 { "" } else { "s" }
            )
        };
        if self.truncated {
            text.push_str(" Result truncated at the configured row limit.");
        }
        text
    }
}

/// Database table column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    /// Column name
    pub name: String,

    /// Declared data type (e.g., "integer", "character varying", "TEXT")
    pub data_type: String,

    /// Whether column accepts NULL values
    pub nullable: bool,
}

/// Table name plus its columns in physical column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
    pub table: String,
    pub columns: Vec<ColumnDescription>,
}

impl std::fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Table: {}", self.table)?;
        writeln!(f, "Columns:")?;
        for column in &self.columns {
            writeln!(
                f,
                " - {} ({}, Nullable: {})",
                column.name,
                column.data_type,
                if column.nullable { "YES" } else { "NO" }
            )?;
        }
        Ok(())
    }
}
