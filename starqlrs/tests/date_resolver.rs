//! Date window resolution against a pinned `today`.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use starql::dates::{resolve_phrase, resolve_range, CustomDate};
use starql::StarqlError;

fn ranges() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("last_12_months".to_string(), 365),
        ("last_6_months".to_string(), 182),
        ("last_3_months".to_string(), 90),
    ])
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

#[test]
fn named_ranges_are_rolling_day_windows() {
    let (start, end) = resolve_range(Some("last_3_months"), None, &ranges(), today()).unwrap();
    assert_eq!(start, "2025-03-17");
    assert_eq!(end, "2025-06-15");
}

#[test]
fn last_month_is_calendar_bounded() {
    let (start, end) = resolve_range(Some("last_month"), None, &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2025-05-01", "2025-05-31"));

    // synonym
    let (start, _) = resolve_range(Some("previous_month"), None, &ranges(), today()).unwrap();
    assert_eq!(start, "2025-05-01");

    // year boundary
    let january = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    let (start, end) = resolve_range(Some("last_month"), None, &ranges(), january).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2024-12-01", "2024-12-31"));
}

#[test]
fn this_month_runs_to_month_end() {
    let (start, end) = resolve_range(Some("this_month"), None, &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2025-06-01", "2025-06-30"));

    let (start, end) = resolve_range(Some("current_month"), None, &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2025-06-01", "2025-06-30"));
}

#[test]
fn custom_date_wins_over_named_range() {
    let custom = CustomDate::Absolute {
        start: "2024-01-01".to_string(),
        end: "2024-03-31".to_string(),
    };
    let (start, end) =
        resolve_range(Some("last_3_months"), Some(&custom), &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2024-01-01", "2024-03-31"));
}

#[test]
fn inverted_absolute_range_is_rejected() {
    let custom = CustomDate::Absolute {
        start: "2024-06-01".to_string(),
        end: "2024-01-01".to_string(),
    };
    let err = resolve_range(None, Some(&custom), &ranges(), today()).unwrap_err();
    assert!(matches!(err, StarqlError::Date(_)));
}

#[test]
fn quarters_and_fiscal_years_resolve_to_bounds() {
    let q1 = CustomDate::Period {
        period: "2024-Q1".to_string(),
    };
    let (start, end) = resolve_range(None, Some(&q1), &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2024-01-01", "2024-03-31"));

    let q4 = CustomDate::Period {
        period: "2024-q4".to_string(),
    };
    let (start, end) = resolve_range(None, Some(&q4), &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2024-10-01", "2024-12-31"));

    let fy = CustomDate::Period {
        period: "2024-FY".to_string(),
    };
    let (start, end) = resolve_range(None, Some(&fy), &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2024-01-01", "2024-12-31"));

    let bad = CustomDate::Period {
        period: "2024-Q5".to_string(),
    };
    assert!(resolve_range(None, Some(&bad), &ranges(), today()).is_err());
}

#[test]
fn single_month_handles_leap_years() {
    let feb = CustomDate::Month {
        month: "2024-02".to_string(),
    };
    let (start, end) = resolve_range(None, Some(&feb), &ranges(), today()).unwrap();
    assert_eq!((start.as_str(), end.as_str()), ("2024-02-01", "2024-02-29"));
}

#[test]
fn missing_and_unknown_ranges_are_errors() {
    assert!(matches!(
        resolve_range(None, None, &ranges(), today()).unwrap_err(),
        StarqlError::Date(_)
    ));
    assert!(matches!(
        resolve_range(Some(""), None, &ranges(), today()).unwrap_err(),
        StarqlError::Date(_)
    ));
    assert!(matches!(
        resolve_range(Some("last_50_years"), None, &ranges(), today()).unwrap_err(),
        StarqlError::Date(_)
    ));
}

#[test]
fn phrases_match_configured_keys_exactly() {
    let hit = resolve_phrase("show revenue for the last 6 months", &ranges()).unwrap();
    assert_eq!(hit.range_key, "last_6_months");
    assert!(!hit.auto_mapped);
}

#[test]
fn unsupported_spans_map_to_the_nearest_range() {
    let hit = resolve_phrase("deals closed in the past 5 months", &ranges()).unwrap();
    assert_eq!(hit.range_key, "last_6_months");
    assert!(hit.auto_mapped);

    let hit = resolve_phrase("2 months of revenue", &ranges()).unwrap();
    assert_eq!(hit.range_key, "last_3_months");
    assert!(hit.auto_mapped);
}

#[test]
fn phrase_fallbacks() {
    // no time phrase at all: prefer last_6_months when configured
    let hit = resolve_phrase("revenue by region", &ranges()).unwrap();
    assert_eq!(hit.range_key, "last_6_months");
    assert!(!hit.auto_mapped);

    // empty question: first key in sorted order
    let hit = resolve_phrase("", &ranges()).unwrap();
    assert_eq!(hit.range_key, "last_12_months");

    // a single configured range is always the answer
    let single = BTreeMap::from([("last_90_days".to_string(), 90)]);
    let hit = resolve_phrase("whatever", &single).unwrap();
    assert_eq!(hit.range_key, "last_90_days");

    assert!(resolve_phrase("anything", &BTreeMap::new()).is_none());
}
