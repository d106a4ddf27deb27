//! SQL dialect abstractions.
//!
//! Dialects render identifiers and primitive fragments; query structure
//! lives in the builder. The supported set is closed: an unknown dialect
//! name is rejected before any other build work happens.

use crate::error::{Result, StarqlError};

pub trait Dialect {
    fn name(&self) -> &'static str;
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
    /// Named placeholder for a bound parameter.
    fn placeholder(&self, name: &str) -> String {
        format!(":{name}")
    }
    /// Bucket a date expression into a `YYYY-MM` month string.
    fn month_bucket(&self, expr: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn month_bucket(&self, expr: &str) -> String {
        format!("strftime('%Y-%m', {expr})")
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn month_bucket(&self, expr: &str) -> String {
        format!("to_char(date_trunc('month', {expr}), 'YYYY-MM')")
    }
}

/// Look up a dialect by name.
pub fn dialect_for(name: &str) -> Result<Box<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "sqlite" => Ok(Box::new(SqliteDialect)),
        "postgres" | "postgresql" => Ok(Box::new(PostgresDialect)),
        other => Err(StarqlError::Sql(format!("unsupported dialect: {other}"))),
    }
}
