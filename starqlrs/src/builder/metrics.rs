//! Metric expression selection.

use crate::config::{MetricExpr, TenantConfig};
use crate::error::{Result, StarqlError};
use crate::intent::Intent;

/// Pick the aggregate expression for an intent: a derived expression wins
/// verbatim (the caller owns its correctness), otherwise the metric key is
/// looked up in the tenant config.
pub(crate) fn metric_expression(intent: &Intent, config: &TenantConfig) -> Result<String> {
    if let Some(derived) = &intent.derived_expression {
        return Ok(derived.trim().to_string());
    }
    let expr = config.metrics.get(&intent.metric).ok_or_else(|| {
        StarqlError::Sql(format!("unknown metric: {}", intent.metric))
    })?;
    Ok(render_metric(expr))
}

pub(crate) fn render_metric(expr: &MetricExpr) -> String {
    match expr {
        MetricExpr::Count(None) => "COUNT(*)".to_string(),
        MetricExpr::Count(Some(col)) => format!("COUNT({col})"),
        MetricExpr::Avg(col) => format!("AVG({col})"),
        MetricExpr::Sum(col) => format!("SUM({col})"),
        MetricExpr::Raw(raw) => raw.clone(),
    }
}
