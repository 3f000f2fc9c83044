//! SQL parsing utilities: dialect selection, statement parsing and statement boundary scanning
//!
//! Uses the sqlparser crate as the grammar parser. The gate never parses SQL by hand;
//! it only consumes the statement trees and token streams produced here.

use crate::types::DatabaseType;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError, Whitespace};

/// Get appropriate SQL dialect for the database type
pub(crate) fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::Postgres => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL | DatabaseType::MariaDB => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Parse SQL text into statement trees using the dialect for `db_type`
///
/// # Examples
/// ```
/// # use readonly_sql_gate::sql_parser::parse_statements;
/// # use readonly_sql_gate::types::DatabaseType;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let stmts = parse_statements("SELECT 1; SELECT 'a;b'", DatabaseType::Postgres)?;
/// assert_eq!(stmts.len(), 2);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns the parser error for unterminated literals or invalid syntax.
pub fn parse_statements(sql: &str, db_type: DatabaseType) -> Result<Vec<Statement>, ParserError> {
    let dialect = get_dialect(db_type);
    Parser::parse_sql(&*dialect, sql)
}

/// Facts about raw SQL text that the statement tree does not carry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenScan {
    /// A statement boundary (`;`) is followed by more SQL
    pub trailing_statement: bool,
    /// First comment the server executes (`/*! ... */`) or treats as an
    /// optimizer hint (`/*+ ... */`); MySQL and MariaDB only
    pub executable_comment: Option<String>,
    /// Locking clause spelled in a form the parser rejects (`FOR NO KEY UPDATE`,
    /// `FOR KEY SHARE`, `LOCK IN SHARE MODE`)
    pub locking_clause: Option<&'static str>,
}

const UNPARSED_LOCKING_CLAUSES: &[(&[&str], &str)] = &[
    (&["FOR", "NO", "KEY", "UPDATE"], "FOR NO KEY UPDATE"),
    (&["FOR", "KEY", "SHARE"], "FOR KEY SHARE"),
    (&["LOCK", "IN", "SHARE", "MODE"], "LOCK IN SHARE MODE"),
];

/// Scan the token stream of the raw text.
///
/// Works on tokens rather than characters, so semicolons and keywords inside string
/// literals, quoted identifiers, dollar-quoted bodies and ordinary comments are ignored.
/// A trailing semicolon followed only by whitespace, comments or further semicolons
/// is not a second statement.
///
/// # Examples
/// ```
/// # use readonly_sql_gate::sql_parser::scan_tokens;
/// # use readonly_sql_gate::types::DatabaseType;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// assert!(scan_tokens("SELECT 1; DROP TABLE users", DatabaseType::Postgres)?.trailing_statement);
/// assert!(!scan_tokens("SELECT ';' ; -- done", DatabaseType::Postgres)?.trailing_statement);
///
/// let scan = scan_tokens("SELECT 1 /*!50000 , SLEEP(10) */", DatabaseType::MySQL)?;
/// assert_eq!(scan.executable_comment.as_deref(), Some("/*!50000 , SLEEP(10) */"));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns the tokenizer error when the text cannot be tokenized.
pub fn scan_tokens(sql: &str, db_type: DatabaseType) -> Result<TokenScan, TokenizerError> {
    let dialect = get_dialect(db_type);
    let tokens = Tokenizer::new(&*dialect, sql).tokenize()?;
    let mysql_family = matches!(db_type, DatabaseType::MySQL | DatabaseType::MariaDB);

    let mut scan = TokenScan::default();
    let mut after_boundary = false;
    let mut words: Vec<Option<String>> = Vec::with_capacity(tokens.len());

    for token in &tokens {
        match token {
            Token::Whitespace(Whitespace::MultiLineComment(body)) => {
                if mysql_family
                    && scan.executable_comment.is_none()
                    && (body.starts_with('!') || body.starts_with('+'))
                {
                    scan.executable_comment = Some(format!("/*{}*/", body));
                }
            }
            Token::Whitespace(_) | Token::EOF => {}
            Token::SemiColon => {
                after_boundary = true;
                words.push(None);
            }
            other => {
                if after_boundary {
                    scan.trailing_statement = true;
                }
                words.push(match other {
                    Token::Word(word) if word.quote_style.is_none() => {
                        Some(word.value.to_uppercase())
                    }
                    _ => None,
                });
            }
        }
    }

    scan.locking_clause = UNPARSED_LOCKING_CLAUSES
        .iter()
        .find(|(pattern, _)| {
            words.windows(pattern.len()).any(|window| {
                window
                    .iter()
                    .zip(pattern.iter())
                    .all(|(word, expected)| word.as_deref() == Some(*expected))
            })
        })
        .map(|(_, clause)| *clause);

    Ok(scan)
}
