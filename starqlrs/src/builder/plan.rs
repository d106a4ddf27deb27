//! Query plan intermediate representation.
//!
//! A plan is constructed fresh per build call and discarded after rendering;
//! it is never cached or mutated after `render`. Separating the plan from
//! rendering keeps alias assignment and filter placement testable without
//! string comparisons against full statements.

use std::collections::BTreeMap;

use crate::dialect::Dialect;

/// A rendered statement plus its named parameters. Filter values are only
/// ever bound here, never interpolated into the SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanExpr {
    /// An alias-qualified column reference (`f.close_date`, `d0.country`).
    Column { table: String, name: String },
    /// The calendar-month bucket of an alias-qualified column.
    MonthBucket { table: String, name: String },
    /// The metric aggregate expression, emitted verbatim.
    Metric(String),
    /// The empty-string placeholder the trend shape emits for `group_col`.
    EmptyLiteral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub expr: PlanExpr,
    pub alias: String,
}

/// An inner join from the fact table to a dimension table on a shared key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub table: String,
    pub alias: String,
    pub join_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `f.<date_column> BETWEEN :start_date AND :end_date`, inclusive both ends.
    DateBetween { table: String, column: String },
    /// An equality filter bound to a named parameter.
    Eq {
        table: String,
        column: String,
        param: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordering always targets a select-list alias, so the rendered ORDER BY is
/// stable regardless of which table the underlying expression came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub alias: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub fact_table: String,
    pub fact_alias: String,
    pub select: Vec<SelectItem>,
    pub joins: Vec<JoinClause>,
    pub predicates: Vec<Predicate>,
    pub group_by: Vec<PlanExpr>,
    pub order_by: Vec<OrderItem>,
    pub params: BTreeMap<String, String>,
}

impl QueryPlan {
    pub fn new(fact_table: &str, fact_alias: &str) -> Self {
        Self {
            fact_table: fact_table.to_string(),
            fact_alias: fact_alias.to_string(),
            select: Vec::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn select_as(&mut self, expr: PlanExpr, alias: &str) {
        self.select.push(SelectItem {
            expr,
            alias: alias.to_string(),
        });
    }

    pub fn render(&self, dialect: &dyn Dialect) -> BoundQuery {
        let select_items: Vec<String> = self
            .select
            .iter()
            .map(|item| {
                format!(
                    "{} AS {}",
                    render_expr(&item.expr, dialect),
                    dialect.quote_ident(&item.alias)
                )
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {} {}",
            select_items.join(", "),
            dialect.quote_ident(&self.fact_table),
            dialect.quote_ident(&self.fact_alias)
        );

        for join in &self.joins {
            let key = dialect.quote_ident(&join.join_key);
            sql.push_str(&format!(
                " JOIN {} {} ON {}.{} = {}.{}",
                dialect.quote_ident(&join.table),
                dialect.quote_ident(&join.alias),
                dialect.quote_ident(&self.fact_alias),
                key,
                dialect.quote_ident(&join.alias),
                key
            ));
        }

        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self
                .predicates
                .iter()
                .map(|p| render_predicate(p, dialect))
                .collect();
            sql.push_str(&format!(" WHERE {}", clauses.join(" AND ")));
        }

        if !self.group_by.is_empty() {
            let groups: Vec<String> = self
                .group_by
                .iter()
                .map(|g| render_expr(g, dialect))
                .collect();
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if !self.order_by.is_empty() {
            let orders: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    let direction = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {}", dialect.quote_ident(&o.alias), direction)
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        BoundQuery {
            sql,
            params: self.params.clone(),
        }
    }
}

fn render_expr(expr: &PlanExpr, dialect: &dyn Dialect) -> String {
    match expr {
        PlanExpr::Column { table, name } => format!(
            "{}.{}",
            dialect.quote_ident(table),
            dialect.quote_ident(name)
        ),
        PlanExpr::MonthBucket { table, name } => {
            let column = format!(
                "{}.{}",
                dialect.quote_ident(table),
                dialect.quote_ident(name)
            );
            dialect.month_bucket(&column)
        }
        PlanExpr::Metric(raw) => raw.clone(),
        PlanExpr::EmptyLiteral => "''".to_string(),
    }
}

fn render_predicate(predicate: &Predicate, dialect: &dyn Dialect) -> String {
    match predicate {
        Predicate::DateBetween { table, column } => format!(
            "{}.{} BETWEEN {} AND {}",
            dialect.quote_ident(table),
            dialect.quote_ident(column),
            dialect.placeholder("start_date"),
            dialect.placeholder("end_date")
        ),
        Predicate::Eq {
            table,
            column,
            param,
        } => format!(
            "{}.{} = {}",
            dialect.quote_ident(table),
            dialect.quote_ident(column),
            dialect.placeholder(param)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqliteDialect;

    #[test]
    fn renders_joined_grouped_statement() {
        let mut plan = QueryPlan::new("fact_sales", "f");
        plan.select_as(
            PlanExpr::Column {
                table: "d0".to_string(),
                name: "country".to_string(),
            },
            "group_col",
        );
        plan.select_as(PlanExpr::Metric("SUM(net_revenue)".to_string()), "metric");
        plan.joins.push(JoinClause {
            table: "dim_region".to_string(),
            alias: "d0".to_string(),
            join_key: "region_id".to_string(),
        });
        plan.predicates.push(Predicate::DateBetween {
            table: "f".to_string(),
            column: "close_date".to_string(),
        });
        plan.group_by.push(PlanExpr::Column {
            table: "d0".to_string(),
            name: "country".to_string(),
        });
        plan.order_by.push(OrderItem {
            alias: "metric".to_string(),
            direction: SortDirection::Desc,
        });
        plan.params
            .insert("start_date".to_string(), "2024-01-01".to_string());
        plan.params
            .insert("end_date".to_string(), "2024-12-31".to_string());

        let bound = plan.render(&SqliteDialect);
        assert!(bound.sql.starts_with("SELECT"));
        assert!(bound
            .sql
            .contains("FROM \"fact_sales\" \"f\" JOIN \"dim_region\" \"d0\" ON \"f\".\"region_id\" = \"d0\".\"region_id\""));
        assert!(bound
            .sql
            .contains("WHERE \"f\".\"close_date\" BETWEEN :start_date AND :end_date"));
        assert!(bound.sql.contains("GROUP BY \"d0\".\"country\""));
        assert!(bound.sql.ends_with("ORDER BY \"metric\" DESC"));
        assert_eq!(bound.params.len(), 2);
    }
}
