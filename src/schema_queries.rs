//! Database-specific catalog queries for introspection
//!
//! Pure functions returning fixed SQL text plus bound parameters. Caller-supplied
//! names (table, schema) only ever travel as parameters; they are never spliced into
//! the SQL text.
//!
//! ## Parameter Placeholders
//!
//! - PostgreSQL: `$1`, `$2` (positional)
//! - MySQL/MariaDB: `?` (positional)
//! - SQLite: `?` (positional; table-valued `pragma_table_info()` accepts bound arguments)

use crate::types::DatabaseType;

/// A fixed catalog query with its bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub sql: &'static str,
    pub params: Vec<String>,
}

/// Query listing base tables; result column 0 is the table name
///
/// ## Special Cases
///
/// - **PostgreSQL**: `$1` parameter, defaults to the "public" schema
/// - **MySQL/MariaDB**: `?` parameter, or `DATABASE()` when no schema is given
/// - **SQLite**: queries sqlite_master, excludes internal `sqlite_%` tables
///
/// ## Example
///
/// ```rust
/// use readonly_sql_gate::types::DatabaseType;
/// use readonly_sql_gate::schema_queries::tables_query;
///
/// let query = tables_query(DatabaseType::Postgres, None);
/// assert!(query.sql.contains("$1"));
/// assert_eq!(query.params, vec!["public".to_string()]);
/// ```
pub fn tables_query(db_type: DatabaseType, schema: Option<&str>) -> CatalogQuery {
    match db_type {
        DatabaseType::Postgres => CatalogQuery {
            // CAST: the Any driver does not decode the sql_identifier domain
            sql: "SELECT CAST(table_name AS TEXT) AS table_name FROM information_schema.tables \
                  WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
                  ORDER BY table_name",
            params: vec![schema.unwrap_or("public").to_string()],
        },
        DatabaseType::MySQL | DatabaseType::MariaDB => match schema {
            Some(s) => CatalogQuery {
                sql: "SELECT table_name AS table_name FROM information_schema.tables \
                      WHERE table_schema = ? AND table_type = 'BASE TABLE' \
                      ORDER BY table_name",
                params: vec![s.to_string()],
            },
            None => CatalogQuery {
                sql: "SELECT table_name AS table_name FROM information_schema.tables \
                      WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
                      ORDER BY table_name",
                params: vec![],
            },
        },
        DatabaseType::SQLite => CatalogQuery {
            sql: "SELECT name AS table_name FROM sqlite_master \
                  WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                  ORDER BY name",
            params: vec![],
        },
    }
}

/// Query describing a table's columns in physical order
///
/// Result columns: 0 `column_name`, 1 `data_type`, 2 `is_nullable` ("YES"/"NO").
///
/// ## Example
///
/// ```rust
/// use readonly_sql_gate::types::DatabaseType;
/// use readonly_sql_gate::schema_queries::columns_query;
///
/// let query = columns_query(DatabaseType::Postgres, None, "users; DROP TABLE users");
/// assert!(!query.sql.contains("DROP"));
/// assert_eq!(query.params[1], "users; DROP TABLE users");
/// ```
pub fn columns_query(db_type: DatabaseType, schema: Option<&str>, table: &str) -> CatalogQuery {
    match db_type {
        DatabaseType::Postgres => CatalogQuery {
            sql: "SELECT \
                      CAST(column_name AS TEXT) AS column_name, \
                      CAST(data_type AS TEXT) AS data_type, \
                      CAST(is_nullable AS TEXT) AS is_nullable \
                  FROM information_schema.columns \
                  WHERE table_schema = $1 AND table_name = $2 \
                  ORDER BY ordinal_position",
            params: vec![schema.unwrap_or("public").to_string(), table.to_string()],
        },
        DatabaseType::MySQL | DatabaseType::MariaDB => match schema {
            Some(s) => CatalogQuery {
                sql: "SELECT column_name AS column_name, data_type AS data_type, \
                      is_nullable AS is_nullable \
                      FROM information_schema.columns \
                      WHERE table_schema = ? AND table_name = ? \
                      ORDER BY ordinal_position",
                params: vec![s.to_string(), table.to_string()],
            },
            None => CatalogQuery {
                sql: "SELECT column_name AS column_name, data_type AS data_type, \
                      is_nullable AS is_nullable \
                      FROM information_schema.columns \
                      WHERE table_schema = DATABASE() AND table_name = ? \
                      ORDER BY ordinal_position",
                params: vec![table.to_string()],
            },
        },
        DatabaseType::SQLite => CatalogQuery {
            sql: "SELECT name AS column_name, type AS data_type, \
                  CASE WHEN \"notnull\" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable \
                  FROM pragma_table_info(?) \
                  ORDER BY cid",
            params: vec![table.to_string()],
        },
    }
}
