pub mod builder;
pub mod catalog;
pub mod config;
pub mod dates;
pub mod dialect;
pub mod error;
pub mod intent;
pub mod strategy;
pub mod validate;

use chrono::NaiveDate;

use crate::error::Result;

/// Validate an intent against the tenant vocabulary, resolve its date window
/// against `today`, and compile it to a bound statement in one step.
pub fn validate_and_build(
    intent: &intent::Intent,
    config: &config::TenantConfig,
    catalog: &catalog::SchemaCatalog,
    dialect_name: &str,
    today: NaiveDate,
) -> Result<builder::BoundQuery> {
    let validated = validate::validate_intent(intent, config, today)?;
    builder::SqlBuilder::new(config, catalog).build(&validated, dialect_name)
}

pub use builder::{BoundQuery, BuildMode, SqlBuilder};
pub use catalog::{SchemaCatalog, SchemaProvider, TableSchema};
pub use config::{MetricExpr, StarqlSettings, TenantConfig, TenantRegistry};
pub use dialect::{dialect_for, Dialect, PostgresDialect, SqliteDialect};
pub use error::StarqlError;
pub use dates::CustomDate;
pub use intent::{GroupBy, GroupKey, Intent, ResolvedDates};
pub use strategy::Strategy;
pub use validate::{validate_intent, validate_intent_today};
