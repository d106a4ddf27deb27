//! Query strategy classification.

use crate::intent::{GroupBy, GroupKey};

/// The closed set of query shapes, decided purely by the grouping request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One row, metric only.
    Summary,
    /// Grouped by calendar month, ordered ascending by month.
    Trend,
    /// Grouped by a single dimension, ordered descending by metric.
    GroupBy,
    /// Grouped by several dimensions, no temporal bucketing.
    MultiGroup,
    /// Grouped by month plus other dimensions.
    MultiTrend,
}

impl Strategy {
    pub fn classify(group_by: &GroupBy) -> Strategy {
        match group_by {
            GroupBy::None => Strategy::Summary,
            GroupBy::Month => Strategy::Trend,
            GroupBy::Dimension(_) => Strategy::GroupBy,
            GroupBy::Multi(keys) if keys.is_empty() => Strategy::Summary,
            GroupBy::Multi(keys) => {
                if keys.iter().any(|k| matches!(k, GroupKey::Month)) {
                    Strategy::MultiTrend
                } else {
                    Strategy::MultiGroup
                }
            }
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::Summary => "summary",
            Strategy::Trend => "trend",
            Strategy::GroupBy => "group_by",
            Strategy::MultiGroup => "multi_group",
            Strategy::MultiTrend => "multi_trend",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_group_by_shapes() {
        assert_eq!(Strategy::classify(&GroupBy::None), Strategy::Summary);
        assert_eq!(Strategy::classify(&GroupBy::Month), Strategy::Trend);
        assert_eq!(
            Strategy::classify(&GroupBy::Dimension("region".to_string())),
            Strategy::GroupBy
        );
        assert_eq!(
            Strategy::classify(&GroupBy::Multi(vec![])),
            Strategy::Summary
        );
        assert_eq!(
            Strategy::classify(&GroupBy::Multi(vec![
                GroupKey::Dimension("region".to_string()),
                GroupKey::Dimension("product".to_string()),
            ])),
            Strategy::MultiGroup
        );
        assert_eq!(
            Strategy::classify(&GroupBy::Multi(vec![
                GroupKey::Dimension("sales_rep".to_string()),
                GroupKey::Month,
            ])),
            Strategy::MultiTrend
        );
    }
}
