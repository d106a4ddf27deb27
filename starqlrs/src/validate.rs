//! Intent validation against the tenant vocabulary.
//!
//! Everything an intent references must be declared in the tenant config;
//! anything else is rejected here, before the builder ever sees it. The
//! returned copy carries `resolved_dates`, which the builder requires.

use chrono::{Local, NaiveDate};

use crate::config::TenantConfig;
use crate::dates;
use crate::error::{Result, StarqlError};
use crate::intent::{GroupBy, GroupKey, Intent, ResolvedDates};

/// Validate an intent against `today` (injected for determinism).
pub fn validate_intent(intent: &Intent, config: &TenantConfig, today: NaiveDate) -> Result<Intent> {
    // A derived expression bypasses the metric map entirely.
    if intent.derived_expression.is_none() {
        check(
            !intent.metric.is_empty(),
            "intent missing metric".to_string(),
        )?;
        check(
            config.metrics.contains_key(&intent.metric),
            format!("unsupported metric: {}", intent.metric),
        )?;
    }

    for key in intent.filters.keys() {
        check(
            config.dimensions.contains_key(key),
            format!("unsupported dimension filter: {key}"),
        )?;
    }

    match &intent.group_by {
        GroupBy::None | GroupBy::Month => {}
        GroupBy::Dimension(dim) => check_dimension(config, dim)?,
        GroupBy::Multi(keys) => {
            for key in keys {
                if let GroupKey::Dimension(dim) = key {
                    check_dimension(config, dim)?;
                }
            }
        }
    }

    let (start_date, end_date) = dates::resolve_range(
        intent.date_range.as_deref(),
        intent.custom_date.as_ref(),
        &config.date_ranges,
        today,
    )?;

    let mut validated = intent.clone();
    validated.resolved_dates = Some(ResolvedDates {
        start_date,
        end_date,
    });
    Ok(validated)
}

/// Validate against the wall clock.
pub fn validate_intent_today(intent: &Intent, config: &TenantConfig) -> Result<Intent> {
    validate_intent(intent, config, Local::now().date_naive())
}

fn check_dimension(config: &TenantConfig, dim: &str) -> Result<()> {
    check(
        config.dimensions.contains_key(dim),
        format!("unsupported group_by: {dim}"),
    )
}

fn check(condition: bool, message: String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(StarqlError::Validation(message))
    }
}
