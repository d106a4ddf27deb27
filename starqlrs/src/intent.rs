//! The structured representation of an analytic question.
//!
//! An intent arrives from the upstream question parser, is checked by the
//! validator against the tenant vocabulary, and only then (with
//! `resolved_dates` attached) may reach the SQL builder.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::dates::CustomDate;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub metric: String,
    /// Equality filters: logical dimension name -> value.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_date: Option<CustomDate>,
    /// A verbatim aggregate expression overriding the metric lookup, for
    /// one-off "average X per Y" style questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_expression: Option<String>,
    /// Attached by the validator, never by the intent source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_dates: Option<ResolvedDates>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDates {
    pub start_date: String,
    pub end_date: String,
}

/// The grouping request: absent, the temporal `"month"` marker, a single
/// dimension, or an ordered list mixing dimensions and `"month"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupBy {
    #[default]
    None,
    Month,
    Dimension(String),
    Multi(Vec<GroupKey>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    Month,
    Dimension(String),
}

const MONTH_MARKER: &str = "month";

impl<'de> Deserialize<'de> for GroupBy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => Ok(GroupBy::None),
            Value::String(s) if s.is_empty() => Ok(GroupBy::None),
            Value::String(s) if s == MONTH_MARKER => Ok(GroupBy::Month),
            Value::String(s) => Ok(GroupBy::Dimension(s)),
            Value::Array(items) => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) if s == MONTH_MARKER => keys.push(GroupKey::Month),
                        Value::String(s) => keys.push(GroupKey::Dimension(s)),
                        other => {
                            return Err(de::Error::custom(format!(
                                "group_by entries must be strings, got {other}"
                            )))
                        }
                    }
                }
                Ok(GroupBy::Multi(keys))
            }
            other => Err(de::Error::custom(format!(
                "group_by must be null, a string, or an array, got {other}"
            ))),
        }
    }
}

impl Serialize for GroupBy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            GroupBy::None => serializer.serialize_none(),
            GroupBy::Month => serializer.serialize_str(MONTH_MARKER),
            GroupBy::Dimension(d) => serializer.serialize_str(d),
            GroupBy::Multi(keys) => {
                let items: Vec<&str> = keys
                    .iter()
                    .map(|k| match k {
                        GroupKey::Month => MONTH_MARKER,
                        GroupKey::Dimension(d) => d.as_str(),
                    })
                    .collect();
                items.serialize(serializer)
            }
        }
    }
}
