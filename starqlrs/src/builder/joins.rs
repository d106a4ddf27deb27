//! Join planning: the single "ensure this column is reachable" operation.
//!
//! Every strategy resolves grouping and filter columns through the same
//! [`JoinMap`], which guarantees identical alias numbering (`d0, d1, ...` in
//! first-need order) no matter which query shape asked first, and reuses an
//! existing join before creating a new one.

use crate::builder::BuildMode;
use crate::builder::plan::JoinClause;
use crate::catalog::SchemaCatalog;
use crate::error::{Result, StarqlError};

/// An alias-qualified column reference produced by resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnRef {
    pub table_alias: String,
    pub column: String,
}

pub(crate) struct JoinMap<'a> {
    catalog: &'a SchemaCatalog,
    fact_table: &'a str,
    fact_alias: &'a str,
    mode: BuildMode,
    joins: Vec<JoinClause>,
}

impl<'a> JoinMap<'a> {
    pub fn new(
        catalog: &'a SchemaCatalog,
        fact_table: &'a str,
        fact_alias: &'a str,
        mode: BuildMode,
    ) -> Self {
        Self {
            catalog,
            fact_table,
            fact_alias,
            mode,
            joins: Vec::new(),
        }
    }

    /// Make a physical column reachable and return its qualified reference.
    ///
    /// Resolution order: the fact table itself, then any already-joined
    /// dimension table carrying the column, then a fresh join to the
    /// column's owning dimension table. `context` names the requesting
    /// grouping/filter for error messages.
    pub fn resolve(&mut self, column: &str, context: &str) -> Result<ColumnRef> {
        if self.catalog.has_column(self.fact_table, column) {
            return Ok(self.fact_ref(column));
        }

        for join in &self.joins {
            if self.catalog.has_column(&join.table, column) {
                return Ok(ColumnRef {
                    table_alias: join.alias.clone(),
                    column: column.to_string(),
                });
            }
        }

        match self.catalog.find_dimension_table(column) {
            Some(dim_table) => {
                let dim_table = dim_table.to_string();
                let alias = self.ensure_join(&dim_table, context)?;
                Ok(ColumnRef {
                    table_alias: alias,
                    column: column.to_string(),
                })
            }
            None => self.degrade(column, context),
        }
    }

    /// Join `dim_table` if it is not joined yet, returning its alias.
    /// Failing to determine a join key is always an error; a join is never
    /// silently dropped.
    fn ensure_join(&mut self, dim_table: &str, context: &str) -> Result<String> {
        if let Some(join) = self.joins.iter().find(|j| j.table == dim_table) {
            return Ok(join.alias.clone());
        }
        let join_key = self
            .catalog
            .find_join_key(self.fact_table, dim_table)
            .ok_or_else(|| {
                StarqlError::Schema(format!(
                    "cannot determine join key between {} and {dim_table} for {context}",
                    self.fact_table
                ))
            })?;
        let alias = format!("d{}", self.joins.len());
        self.joins.push(JoinClause {
            table: dim_table.to_string(),
            alias: alias.clone(),
            join_key,
        });
        Ok(alias)
    }

    fn degrade(&self, column: &str, context: &str) -> Result<ColumnRef> {
        match self.mode {
            BuildMode::Permissive => {
                tracing::warn!(
                    column,
                    context,
                    "no owning dimension table; emitting a fact-table reference"
                );
                Ok(self.fact_ref(column))
            }
            BuildMode::Strict => Err(StarqlError::Schema(format!(
                "column {column} for {context} not found on {} or any dimension table",
                self.fact_table
            ))),
        }
    }

    fn fact_ref(&self, column: &str) -> ColumnRef {
        ColumnRef {
            table_alias: self.fact_alias.to_string(),
            column: column.to_string(),
        }
    }

    pub fn into_joins(self) -> Vec<JoinClause> {
        self.joins
    }
}
