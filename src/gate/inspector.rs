//! Deep inspection of read statements
//!
//! Walks the whole statement tree (CTEs, derived tables, subqueries in every clause,
//! set operations) with a sqlparser [`Visitor`]. Every node kind, and every routine
//! name, is matched against an explicit list of things known to be safe; anything
//! else is rejected as a write-through construct. New grammar constructs and new
//! functions are therefore rejected until they are added here.

use super::classifier::ReadStatement;
use super::decision::{Rejection, ViolationKind};
use crate::types::DatabaseType;
use sqlparser::ast::{
    Expr, Ident, ObjectName, ObjectNamePart, Query, SetExpr, Statement, TableFactor, Visit, Visitor,
};
use std::ops::ControlFlow;

// ============================================================================
// Known-safe routines
// ============================================================================

// Built-ins that only compute a value from their arguments. Anything else,
// including user-defined and schema-qualified routines, is rejected.
const COMMON_ROUTINES: &[&str] = &[
    // aggregates
    "count", "sum", "avg", "min", "max", "stddev", "stddev_pop", "stddev_samp",
    "variance", "var_pop", "var_samp", "bit_and", "bit_or", "bit_xor",
    // window
    "row_number", "rank", "dense_rank", "percent_rank", "cume_dist", "ntile",
    "lag", "lead", "first_value", "last_value", "nth_value",
    // numeric
    "abs", "ceil", "ceiling", "floor", "round", "sign", "sqrt", "power", "pow",
    "exp", "ln", "log", "log10", "log2", "mod", "pi", "degrees", "radians",
    "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "cot", "random",
    // conditional
    "coalesce", "nullif", "greatest", "least",
    // string
    "lower", "upper", "length", "char_length", "character_length", "octet_length",
    "concat", "concat_ws", "substr", "substring", "left", "right", "lpad", "rpad",
    "ltrim", "rtrim", "trim", "replace", "reverse", "repeat", "position",
    "ascii", "char", "hex", "md5", "format",
    // date and time
    "now", "current_date", "current_time", "current_timestamp", "localtime",
    "localtimestamp",
    // session identity
    "current_user", "session_user", "user",
];

const POSTGRES_ROUTINES: &[&str] = &[
    "bool_and", "bool_or", "every", "string_agg", "array_agg", "percentile_cont",
    "percentile_disc", "mode", "corr", "covar_pop", "covar_samp", "width_bucket",
    "trunc", "div", "cbrt", "gcd", "lcm", "factorial",
    "btrim", "initcap", "split_part", "strpos", "chr", "translate", "starts_with",
    "regexp_replace", "regexp_match", "regexp_matches", "regexp_split_to_array",
    "regexp_split_to_table", "quote_ident", "quote_literal", "quote_nullable",
    "encode", "decode", "sha224", "sha256", "sha384", "sha512", "to_hex",
    "date_trunc", "date_part", "age", "to_char", "to_date", "to_timestamp",
    "to_number", "make_date", "make_time", "make_timestamp", "make_timestamptz",
    "make_interval", "justify_days", "justify_hours", "justify_interval",
    "isfinite", "clock_timestamp", "statement_timestamp", "transaction_timestamp",
    "generate_series", "generate_subscripts", "unnest", "array_length",
    "array_lower", "array_upper", "array_position", "array_positions",
    "array_to_string", "string_to_array", "array_append", "array_prepend",
    "array_cat", "array_remove", "array_replace", "cardinality",
    "to_json", "to_jsonb", "row_to_json", "array_to_json", "json_build_object",
    "jsonb_build_object", "json_build_array", "jsonb_build_array", "json_object",
    "jsonb_object", "json_agg", "jsonb_agg", "json_object_agg", "jsonb_object_agg",
    "json_array_length", "jsonb_array_length", "json_each", "jsonb_each",
    "json_each_text", "jsonb_each_text", "json_array_elements",
    "jsonb_array_elements", "json_array_elements_text", "jsonb_array_elements_text",
    "json_object_keys", "jsonb_object_keys", "json_extract_path",
    "jsonb_extract_path", "json_extract_path_text", "jsonb_extract_path_text",
    "json_typeof", "jsonb_typeof", "jsonb_pretty", "jsonb_set", "jsonb_insert",
    "json_strip_nulls", "jsonb_strip_nulls", "json_to_record", "jsonb_to_record",
    "json_to_recordset", "jsonb_to_recordset", "jsonb_path_exists",
    "jsonb_path_match", "jsonb_path_query", "jsonb_path_query_array",
    "jsonb_path_query_first", "gen_random_uuid", "current_database",
    "current_schema", "version", "pg_typeof", "format_type",
];

const MYSQL_ROUTINES: &[&str] = &[
    "group_concat", "std", "json_arrayagg", "json_objectagg",
    "truncate", "rand", "conv", "crc32", "sha1", "sha2", "unhex",
    "if", "ifnull", "isnull", "field", "find_in_set", "elt", "instr", "locate",
    "lcase", "ucase", "mid", "space", "strcmp", "soundex", "regexp_like",
    "regexp_replace", "regexp_substr", "regexp_instr",
    "curdate", "curtime", "sysdate", "utc_date", "utc_time", "utc_timestamp",
    "date", "time", "date_format", "time_format", "str_to_date", "date_add",
    "date_sub", "adddate", "subdate", "addtime", "subtime", "datediff",
    "timediff", "timestampdiff", "timestampadd", "year", "month", "day",
    "dayname", "monthname", "hour", "minute", "second", "dayofweek",
    "dayofmonth", "dayofyear", "week", "weekday", "weekofyear", "quarter",
    "yearweek", "last_day", "makedate", "maketime", "from_days", "to_days",
    "from_unixtime", "unix_timestamp", "convert_tz",
    "json_extract", "json_unquote", "json_object", "json_array", "json_contains",
    "json_contains_path", "json_keys", "json_length", "json_valid", "json_type",
    "json_depth", "json_search", "json_quote", "json_pretty",
    "database", "schema", "version",
];

const SQLITE_ROUTINES: &[&str] = &[
    "group_concat", "total", "iif", "ifnull", "instr", "printf", "typeof",
    "quote", "unicode", "likely", "unlikely", "likelihood", "glob", "like",
    "trunc", "randomblob", "zeroblob", "unhex",
    "date", "time", "datetime", "julianday", "unixepoch", "strftime", "timediff",
    "json", "json_extract", "json_object", "json_array", "json_array_length",
    "json_type", "json_valid", "json_quote", "json_insert", "json_replace",
    "json_set", "json_remove", "json_patch", "json_each", "json_tree",
    "json_group_array", "json_group_object", "sqlite_version",
];

/// Whether `name` is a built-in routine known to only compute a value
///
/// Routines not on the list are rejected, whatever they do.
///
/// # Examples
/// ```
/// # use readonly_sql_gate::gate::is_allowed_routine;
/// # use readonly_sql_gate::types::DatabaseType;
/// assert!(is_allowed_routine("COUNT", DatabaseType::Postgres));
/// assert!(is_allowed_routine("generate_series", DatabaseType::Postgres));
/// assert!(!is_allowed_routine("pg_sleep", DatabaseType::Postgres));
/// assert!(!is_allowed_routine("ts_stat", DatabaseType::Postgres));
/// assert!(!is_allowed_routine("sleep", DatabaseType::MySQL));
/// ```
pub fn is_allowed_routine(name: &str, db_type: DatabaseType) -> bool {
    let name = name.to_lowercase();
    let dialect: &[&str] = match db_type {
        DatabaseType::Postgres => POSTGRES_ROUTINES,
        DatabaseType::MySQL | DatabaseType::MariaDB => MYSQL_ROUTINES,
        DatabaseType::SQLite => SQLITE_ROUTINES,
    };
    COMMON_ROUTINES.contains(&name.as_str()) || dialect.contains(&name.as_str())
}

// ============================================================================
// Inspection
// ============================================================================

/// Inspect a classified read statement for locking and write-through constructs.
///
/// # Errors
/// Returns the first violation found, in tree traversal order.
pub fn inspect(read: &ReadStatement, db_type: DatabaseType) -> Result<(), Rejection> {
    let mut inspector = Inspector { db_type };
    match read.query().visit(&mut inspector) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(rejection) => Err(rejection),
    }
}

struct Inspector {
    db_type: DatabaseType,
}

impl Inspector {
    fn check_body(&self, body: &SetExpr) -> ControlFlow<Rejection> {
        match body {
            SetExpr::Select(select) => {
                if let Some(into) = &select.into {
                    return write_through(format!(
                        "SELECT INTO {} creates a new table",
                        into.name
                    ));
                }
                ControlFlow::Continue(())
            }
            SetExpr::SetOperation { left, right, .. } => {
                self.check_body(left)?;
                self.check_body(right)
            }
            // Nested queries get their own pre_visit_query call
            SetExpr::Query(_) | SetExpr::Values(_) | SetExpr::Table(_) => {
                ControlFlow::Continue(())
            }
            other => write_through(format!(
                "{} is not allowed inside a query",
                variant_name(other).to_uppercase()
            )),
        }
    }

    fn check_routine(&self, name: &ObjectName) -> ControlFlow<Rejection> {
        let parts = match name
            .0
            .iter()
            .map(ObjectNamePart::as_ident)
            .collect::<Option<Vec<&Ident>>>()
        {
            Some(parts) => parts,
            None => {
                return write_through(format!(
                    "routine call {} has an unsupported name form",
                    name
                ));
            }
        };

        let ident = match parts.as_slice() {
            [ident] => *ident,
            // pg_catalog.<builtin> names the same built-in
            [schema, ident]
                if self.db_type == DatabaseType::Postgres
                    && schema.value.eq_ignore_ascii_case("pg_catalog") =>
            {
                *ident
            }
            _ => {
                return write_through(format!(
                    "call to schema-qualified routine {} is not allowed",
                    name
                ));
            }
        };

        // Postgres folds unquoted names only; "COUNT" is not count
        let folded = self.db_type == DatabaseType::Postgres
            && ident.quote_style.is_some()
            && ident.value != ident.value.to_lowercase();

        if folded || !is_allowed_routine(&ident.value, self.db_type) {
            return write_through(format!(
                "call to routine {} is not allowed; only known read-only built-in functions are accepted",
                ident.value
            ));
        }
        ControlFlow::Continue(())
    }
}

impl Visitor for Inspector {
    type Break = Rejection;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(lock) = query.locks.first() {
            return ControlFlow::Break(Rejection::new(
                ViolationKind::LockingClausePresent,
                format!("row-locking clause {} is not allowed", lock),
            ));
        }
        if query.for_clause.is_some() {
            return write_through("FOR XML/JSON/BROWSE clauses are not allowed");
        }
        self.check_body(&query.body)
    }

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        let rendered = statement.to_string();
        let keyword = rendered.split_whitespace().next().unwrap_or("UNKNOWN");
        write_through(format!(
            "nested {} statement is not allowed",
            keyword.to_uppercase()
        ))
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        match table_factor {
            TableFactor::Table { name, args, .. } => {
                // Set-returning function call in FROM (e.g. generate_series(1, 10))
                if args.is_some() {
                    return self.check_routine(name);
                }
                ControlFlow::Continue(())
            }
            TableFactor::Function { name, .. } => self.check_routine(name),
            TableFactor::Derived { .. }
            | TableFactor::NestedJoin { .. }
            | TableFactor::UNNEST { .. } => ControlFlow::Continue(()),
            other => write_through(format!(
                "table source {} is not supported",
                variant_name(other).to_uppercase()
            )),
        }
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        match expr {
            Expr::Function(function) => self.check_routine(&function.name),

            // Column references
            Expr::Identifier { .. }
            | Expr::CompoundIdentifier { .. }
            | Expr::CompoundFieldAccess { .. }
            | Expr::JsonAccess { .. }
            | Expr::Wildcard { .. }
            | Expr::QualifiedWildcard { .. }

            // Literals
            | Expr::Value { .. }
            | Expr::TypedString { .. }
            | Expr::Interval { .. }
            | Expr::Array { .. }
            | Expr::Tuple { .. }

            // Predicates and operators
            | Expr::IsFalse { .. }
            | Expr::IsNotFalse { .. }
            | Expr::IsTrue { .. }
            | Expr::IsNotTrue { .. }
            | Expr::IsNull { .. }
            | Expr::IsNotNull { .. }
            | Expr::IsUnknown { .. }
            | Expr::IsNotUnknown { .. }
            | Expr::IsDistinctFrom { .. }
            | Expr::IsNotDistinctFrom { .. }
            | Expr::InList { .. }
            | Expr::InSubquery { .. }
            | Expr::InUnnest { .. }
            | Expr::Between { .. }
            | Expr::BinaryOp { .. }
            | Expr::Like { .. }
            | Expr::ILike { .. }
            | Expr::SimilarTo { .. }
            | Expr::RLike { .. }
            | Expr::AnyOp { .. }
            | Expr::AllOp { .. }
            | Expr::UnaryOp { .. }
            | Expr::Nested { .. }

            // Built-in scalar forms
            | Expr::Cast { .. }
            | Expr::Convert { .. }
            | Expr::AtTimeZone { .. }
            | Expr::Extract { .. }
            | Expr::Ceil { .. }
            | Expr::Floor { .. }
            | Expr::Position { .. }
            | Expr::Substring { .. }
            | Expr::Trim { .. }
            | Expr::Collate { .. }
            | Expr::Case { .. }

            // Subqueries (their bodies are visited separately)
            | Expr::Exists { .. }
            | Expr::Subquery { .. }

            // Grouping
            | Expr::GroupingSets { .. }
            | Expr::Cube { .. }
            | Expr::Rollup { .. } => ControlFlow::Continue(()),

            other => write_through(format!(
                "expression {} is not supported",
                variant_name(other).to_uppercase()
            )),
        }
    }
}

fn write_through(detail: impl Into<String>) -> ControlFlow<Rejection> {
    ControlFlow::Break(Rejection::new(ViolationKind::WriteThroughConstruct, detail))
}

/// Variant name of an AST node, taken from its derived `Debug` output
fn variant_name(node: &impl std::fmt::Debug) -> String {
    format!("{:?}", node)
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::classifier::classify;
    use crate::sql_parser::{parse_statements, scan_tokens};

    fn inspect_sql(sql: &str, db_type: DatabaseType) -> Result<(), Rejection> {
        let statements = parse_statements(sql, db_type).unwrap();
        let scan = scan_tokens(sql, db_type).unwrap();
        let read = classify(statements, &scan).unwrap();
        inspect(&read, db_type)
    }

    fn pg(sql: &str) -> Result<(), Rejection> {
        inspect_sql(sql, DatabaseType::Postgres)
    }

    fn assert_kind(sql: &str, kind: ViolationKind) {
        match pg(sql) {
            Ok(()) => panic!("expected {kind} for {sql}"),
            Err(rejection) => assert_eq!(rejection.kind(), kind, "{sql}: {rejection}"),
        }
    }

    #[test]
    fn test_allows_complex_safe_query() {
        let sql = r#"
            WITH user_stats AS (
                SELECT user_id, COUNT(*) as order_count
                FROM orders
                WHERE created_at > NOW() - INTERVAL '30 days'
                GROUP BY user_id
            )
            SELECT u.*, us.order_count, CAST(u.id AS TEXT), COALESCE(u.name, 'n/a')
            FROM users u
            INNER JOIN user_stats us ON u.id = us.user_id
            LEFT JOIN (SELECT id FROM teams) t ON t.id = u.team_id
            WHERE u.active = true
              AND u.id IN (SELECT user_id FROM subscriptions WHERE status = 'active')
              AND EXISTS (SELECT 1 FROM audit a WHERE a.user_id = u.id)
              AND u.name LIKE 'a%'
              AND u.age BETWEEN 18 AND 65
            ORDER BY us.order_count DESC
            LIMIT 100
        "#;
        assert!(pg(sql).is_ok(), "{:?}", pg(sql));
    }

    #[test]
    fn test_allows_case_and_union() {
        assert!(pg("SELECT CASE WHEN id > 1 THEN 'a' ELSE 'b' END FROM t UNION ALL SELECT 'c'").is_ok());
    }

    #[test]
    fn test_allows_set_returning_function() {
        assert!(pg("SELECT * FROM generate_series(1, 10)").is_ok());
    }

    #[test]
    fn test_blocks_for_update() {
        assert_kind("SELECT * FROM accounts FOR UPDATE", ViolationKind::LockingClausePresent);
        assert_kind("SELECT * FROM accounts FOR SHARE", ViolationKind::LockingClausePresent);
    }

    #[test]
    fn test_blocks_locking_in_subquery() {
        assert_kind(
            "SELECT * FROM (SELECT * FROM accounts FOR UPDATE) a",
            ViolationKind::LockingClausePresent,
        );
    }

    #[test]
    fn test_blocks_select_into() {
        assert_kind("SELECT * INTO backup FROM users", ViolationKind::WriteThroughConstruct);
    }

    #[test]
    fn test_blocks_cte_with_delete() {
        assert_kind(
            "WITH deleted AS (DELETE FROM users WHERE id = 1 RETURNING *) SELECT * FROM deleted",
            ViolationKind::WriteThroughConstruct,
        );
    }

    #[test]
    fn test_blocks_cte_with_insert() {
        assert_kind(
            "WITH inserted AS (INSERT INTO logs VALUES (1) RETURNING *) SELECT * FROM inserted",
            ViolationKind::WriteThroughConstruct,
        );
    }

    #[test]
    fn test_blocks_cte_with_update() {
        let err = pg("WITH updated AS (UPDATE users SET active = false RETURNING *) SELECT * FROM updated")
            .unwrap_err();
        assert_eq!(err.kind(), ViolationKind::WriteThroughConstruct);
        assert!(err.detail().contains("UPDATE"), "{}", err.detail());
    }

    #[test]
    fn test_blocks_nested_cte_with_write() {
        assert_kind(
            "WITH outer_cte AS (WITH inner_cte AS (DELETE FROM t RETURNING *) SELECT * FROM inner_cte) SELECT * FROM outer_cte",
            ViolationKind::WriteThroughConstruct,
        );
    }

    #[test]
    fn test_blocks_side_effecting_routines() {
        assert_kind("SELECT nextval('users_id_seq')", ViolationKind::WriteThroughConstruct);
        assert_kind("SELECT pg_sleep(10)", ViolationKind::WriteThroughConstruct);
        assert_kind(
            "SELECT * FROM users WHERE id = 1 AND pg_catalog.set_config('role', 'admin', false) IS NOT NULL",
            ViolationKind::WriteThroughConstruct,
        );
        assert_kind("SELECT pg_advisory_lock(1)", ViolationKind::WriteThroughConstruct);
        assert_kind(
            "SELECT * FROM dblink('host=evil', 'DELETE FROM users')",
            ViolationKind::WriteThroughConstruct,
        );
    }

    #[test]
    fn test_blocks_routines_missing_from_safe_list() {
        for sql in [
            "SELECT * FROM ts_stat('SELECT to_tsvector(pg_sleep(10)::text)')",
            "SELECT ts_rewrite('a'::tsquery, 'SELECT t, s FROM aliases')",
            "SELECT query_to_xml('DELETE FROM users RETURNING *', true, false, '')",
            "SELECT pg_stat_statements_reset()",
            "SELECT * FROM pg_logical_slot_get_changes('s', NULL, NULL)",
            "SELECT pg_replication_slot_advance('s', '0/0')",
            "SELECT some_function_nobody_listed(1)",
        ] {
            assert_kind(sql, ViolationKind::WriteThroughConstruct);
        }
    }

    #[test]
    fn test_blocks_schema_qualified_routines() {
        let err = pg("SELECT my_schema.delete_everything()").unwrap_err();
        assert_eq!(err.kind(), ViolationKind::WriteThroughConstruct);
        assert!(err.detail().contains("schema-qualified"), "{}", err.detail());
        // Even when the bare name is a known built-in
        assert_kind("SELECT public.lower('A')", ViolationKind::WriteThroughConstruct);
    }

    #[test]
    fn test_allows_catalog_qualified_builtin() {
        assert!(pg("SELECT pg_catalog.lower(name) FROM users").is_ok());
    }

    #[test]
    fn test_quoted_name_must_match_builtin_exactly() {
        assert!(pg("SELECT \"lower\"(name) FROM users").is_ok());
        assert_kind("SELECT \"LOWER\"(name) FROM users", ViolationKind::WriteThroughConstruct);
    }

    #[test]
    fn test_allows_common_builtins() {
        let sql = "SELECT lower(name), length(name), ROUND(AVG(score), 2), \
                   ROW_NUMBER() OVER (ORDER BY id), date_trunc('day', created_at), \
                   jsonb_build_object('id', id), CURRENT_TIMESTAMP \
                   FROM users GROUP BY id, name, created_at";
        assert!(pg(sql).is_ok(), "{:?}", pg(sql));
        assert!(inspect_sql("SELECT IFNULL(name, 'x'), DATE_FORMAT(NOW(), '%Y') FROM users", DatabaseType::MySQL).is_ok());
        assert!(inspect_sql("SELECT * FROM json_each('[1,2]')", DatabaseType::SQLite).is_ok());
    }

    #[test]
    fn test_allowlist_is_per_dialect() {
        assert!(is_allowed_routine("date_format", DatabaseType::MySQL));
        assert!(!is_allowed_routine("date_format", DatabaseType::Postgres));
        assert!(!is_allowed_routine("load_extension", DatabaseType::SQLite));
        assert!(!is_allowed_routine("benchmark", DatabaseType::MariaDB));
    }

    #[test]
    fn test_blocks_routine_inside_aggregate_argument() {
        assert_kind("SELECT COUNT(nextval('s')) FROM users", ViolationKind::WriteThroughConstruct);
    }

    #[test]
    fn test_dialect_specific_routines() {
        let err = inspect_sql("SELECT SLEEP(5)", DatabaseType::MySQL).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::WriteThroughConstruct);
        let err = inspect_sql("SELECT load_extension('evil.so')", DatabaseType::SQLite).unwrap_err();
        assert_eq!(err.kind(), ViolationKind::WriteThroughConstruct);
    }

    #[test]
    fn test_unrecognized_expression_rejected() {
        // Not on the known-safe list, rejected by default
        let err = pg("SELECT OVERLAY(name PLACING 'x' FROM 1 FOR 1) FROM users").unwrap_err();
        assert_eq!(err.kind(), ViolationKind::WriteThroughConstruct);
        assert!(err.detail().contains("OVERLAY"), "{}", err.detail());
    }

    #[test]
    fn test_variant_name() {
        assert_eq!(variant_name(&ViolationKind::SyntaxError), "SyntaxError");
        assert_eq!(variant_name(&Some(1)), "Some");
    }
}
