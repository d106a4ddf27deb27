//! SQL assembly.
//!
//! Turns a validated intent into a parameterized statement for the tenant's
//! star schema. Grouping and filter columns are routed through one join
//! planner so alias assignment is deterministic across strategies, and every
//! filter value is bound as a named parameter.

mod joins;
mod metrics;
mod plan;

pub use plan::BoundQuery;

use crate::catalog::SchemaCatalog;
use crate::config::{BuilderSettings, TenantConfig};
use crate::dialect::{dialect_for, Dialect};
use crate::error::{Result, StarqlError};
use crate::intent::{GroupBy, GroupKey, Intent};
use crate::strategy::Strategy;

use self::joins::JoinMap;
use self::plan::{OrderItem, PlanExpr, Predicate, QueryPlan, SortDirection};

/// The fact table always carries this alias; dimension joins get `d0, d1, ...`.
const FACT_ALIAS: &str = "f";

/// How to handle a grouping or filter column that cannot be mapped to the
/// fact table or any dimension table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Fail the build with a schema error.
    #[default]
    Strict,
    /// Emit a fact-table reference anyway; the statement may then fail at
    /// execution time with a missing-column error.
    Permissive,
}

pub struct SqlBuilder<'a> {
    config: &'a TenantConfig,
    catalog: &'a SchemaCatalog,
    mode: BuildMode,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(config: &'a TenantConfig, catalog: &'a SchemaCatalog) -> Self {
        Self {
            config,
            catalog,
            mode: BuildMode::Strict,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Construct with the mode the runtime settings ask for; pair with
    /// `settings.dialect` when calling [`SqlBuilder::build`].
    pub fn from_settings(
        config: &'a TenantConfig,
        catalog: &'a SchemaCatalog,
        settings: &BuilderSettings,
    ) -> Self {
        let mode = if settings.permissive {
            BuildMode::Permissive
        } else {
            BuildMode::Strict
        };
        Self::new(config, catalog).with_mode(mode)
    }

    /// Build for a dialect name from the closed supported set. Unknown names
    /// are rejected before any other work.
    pub fn build(&self, intent: &Intent, dialect_name: &str) -> Result<BoundQuery> {
        let dialect = dialect_for(dialect_name)?;
        self.build_with_dialect(intent, dialect.as_ref())
    }

    pub fn build_with_dialect(
        &self,
        intent: &Intent,
        dialect: &dyn Dialect,
    ) -> Result<BoundQuery> {
        let resolved = intent.resolved_dates.as_ref().ok_or_else(|| {
            StarqlError::Validation(
                "intent has no resolved dates; run the validator first".to_string(),
            )
        })?;
        let strategy = Strategy::classify(&intent.group_by);
        tracing::debug!(%strategy, dialect = dialect.name(), metric = %intent.metric, "building query");

        let metric = PlanExpr::Metric(metrics::metric_expression(intent, self.config)?);

        let mut plan = QueryPlan::new(&self.config.fact_table, FACT_ALIAS);
        plan.predicates.push(Predicate::DateBetween {
            table: FACT_ALIAS.to_string(),
            column: self.config.date_column.clone(),
        });
        plan.params
            .insert("start_date".to_string(), resolved.start_date.clone());
        plan.params
            .insert("end_date".to_string(), resolved.end_date.clone());

        let mut joins = JoinMap::new(self.catalog, &self.config.fact_table, FACT_ALIAS, self.mode);

        // The classifier decides the query shape; grouping payloads come
        // from the intent. An empty grouping list classifies as a summary.
        match (strategy, &intent.group_by) {
            (Strategy::Summary, _) => {
                plan.select_as(metric, "metric");
            }
            (Strategy::Trend, _) => {
                let month = self.month_expr();
                plan.select_as(month.clone(), "month");
                // legacy trend contract: a group_col column is always present
                plan.select_as(PlanExpr::EmptyLiteral, "group_col");
                plan.select_as(metric, "metric");
                plan.group_by.push(month);
                plan.order_by.push(OrderItem {
                    alias: "month".to_string(),
                    direction: SortDirection::Asc,
                });
            }
            (Strategy::GroupBy, GroupBy::Dimension(dim)) => {
                let column = self.config.map_dimension(dim);
                let resolved_col = joins.resolve(&column, &format!("group_by {dim}"))?;
                let expr = PlanExpr::Column {
                    table: resolved_col.table_alias,
                    name: resolved_col.column,
                };
                plan.select_as(expr.clone(), "group_col");
                plan.select_as(metric, "metric");
                plan.group_by.push(expr);
                plan.order_by.push(OrderItem {
                    alias: "metric".to_string(),
                    direction: SortDirection::Desc,
                });
            }
            (Strategy::MultiGroup | Strategy::MultiTrend, GroupBy::Multi(keys)) => {
                for key in keys {
                    match key {
                        GroupKey::Month => {
                            let month = self.month_expr();
                            plan.select_as(month.clone(), "month");
                            plan.group_by.push(month);
                            plan.order_by.push(OrderItem {
                                alias: "month".to_string(),
                                direction: SortDirection::Asc,
                            });
                        }
                        GroupKey::Dimension(dim) => {
                            let column = self.config.map_dimension(dim);
                            let resolved_col =
                                joins.resolve(&column, &format!("group_by {dim}"))?;
                            let expr = PlanExpr::Column {
                                table: resolved_col.table_alias,
                                name: resolved_col.column,
                            };
                            plan.select_as(expr.clone(), &column);
                            plan.group_by.push(expr);
                            plan.order_by.push(OrderItem {
                                alias: column,
                                direction: SortDirection::Asc,
                            });
                        }
                    }
                }
                plan.select_as(metric, "metric");
            }
            (strategy, group_by) => {
                return Err(StarqlError::Sql(format!(
                    "strategy {strategy} cannot be built from grouping {group_by:?}"
                )));
            }
        }

        for (dimension, value) in &intent.filters {
            let column = self.config.map_dimension(dimension);
            let resolved_col = joins.resolve(&column, &format!("filter {dimension}"))?;
            plan.predicates.push(Predicate::Eq {
                table: resolved_col.table_alias,
                column: resolved_col.column,
                param: dimension.clone(),
            });
            plan.params.insert(dimension.clone(), value.clone());
        }

        plan.joins = joins.into_joins();
        let bound = plan.render(dialect);
        tracing::debug!(sql = %bound.sql, params = bound.params.len(), "generated statement");
        Ok(bound)
    }

    fn month_expr(&self) -> PlanExpr {
        PlanExpr::MonthBucket {
            table: FACT_ALIAS.to_string(),
            name: self.config.date_column.clone(),
        }
    }
}
