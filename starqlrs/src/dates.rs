//! Date range resolution.
//!
//! Named ranges are rolling N-day windows ending today; the calendar-month
//! tokens are an explicit exception and resolve to calendar bounds. Custom
//! payloads cover absolute ranges, ISO periods (`2024-Q1`, `2024-FY`) and
//! single months (`2024-03`). All outputs are ISO-8601 date strings.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StarqlError};

/// A custom date payload attached to an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomDate {
    /// `{"start": "2024-01-01", "end": "2024-03-31"}`
    Absolute { start: String, end: String },
    /// `{"period": "2024-Q1"}` or `{"period": "2024-FY"}`
    Period { period: String },
    /// `{"month": "2024-03"}`
    Month { month: String },
}

/// Resolve an intent's date range to `(start_date, end_date)` ISO strings,
/// against an explicit `today` so results are deterministic.
pub fn resolve_range(
    date_range: Option<&str>,
    custom: Option<&CustomDate>,
    date_ranges: &BTreeMap<String, u32>,
    today: NaiveDate,
) -> Result<(String, String)> {
    if let Some(custom) = custom {
        return resolve_custom(custom);
    }

    let key = date_range
        .filter(|k| !k.is_empty())
        .ok_or_else(|| StarqlError::Date("no date range specified".to_string()))?;

    // Calendar-month tokens resolve to month bounds, not a day-count window.
    match key {
        "last_month" | "previous_month" => {
            let (year, month) = if today.month() == 1 {
                (today.year() - 1, 12)
            } else {
                (today.year(), today.month() - 1)
            };
            return month_bounds(year, month);
        }
        "this_month" | "current_month" => {
            return month_bounds(today.year(), today.month());
        }
        _ => {}
    }

    let days = date_ranges
        .get(key)
        .ok_or_else(|| StarqlError::Date(format!("unsupported date range: {key}")))?;
    let start = today - Duration::days(i64::from(*days));
    Ok((start.to_string(), today.to_string()))
}

/// Resolve against the wall clock.
pub fn resolve_range_today(
    date_range: Option<&str>,
    custom: Option<&CustomDate>,
    date_ranges: &BTreeMap<String, u32>,
) -> Result<(String, String)> {
    resolve_range(date_range, custom, date_ranges, Local::now().date_naive())
}

fn resolve_custom(custom: &CustomDate) -> Result<(String, String)> {
    match custom {
        CustomDate::Absolute { start, end } => {
            let start_date = parse_iso(start)?;
            let end_date = parse_iso(end)?;
            if start_date > end_date {
                return Err(StarqlError::Date(
                    "start date must be before end date".to_string(),
                ));
            }
            Ok((start_date.to_string(), end_date.to_string()))
        }
        CustomDate::Period { period } => resolve_period(period),
        CustomDate::Month { month } => resolve_month(month),
    }
}

fn resolve_period(period: &str) -> Result<(String, String)> {
    let (year_str, token) = period
        .split_once('-')
        .ok_or_else(|| StarqlError::Date(format!("period must be like '2024-Q1': {period}")))?;
    let year: i32 = year_str
        .parse()
        .map_err(|_| StarqlError::Date(format!("invalid year in period: {period}")))?;

    let token_upper = token.to_uppercase();
    if let Some(q) = token_upper.strip_prefix('Q') {
        let quarter: u32 = q
            .parse()
            .map_err(|_| StarqlError::Date(format!("invalid quarter: {token}")))?;
        if !(1..=4).contains(&quarter) {
            return Err(StarqlError::Date(format!("invalid quarter: {token}")));
        }
        let first_month = (quarter - 1) * 3 + 1;
        let start = make_date(year, first_month, 1)?;
        let end = end_of_month(year, first_month + 2)?;
        return Ok((start.to_string(), end.to_string()));
    }

    if token_upper == "FY" {
        let start = make_date(year, 1, 1)?;
        let end = make_date(year, 12, 31)?;
        return Ok((start.to_string(), end.to_string()));
    }

    Err(StarqlError::Date(format!("unsupported period token: {token}")))
}

fn resolve_month(month_token: &str) -> Result<(String, String)> {
    let (year_str, month_str) = month_token
        .split_once('-')
        .ok_or_else(|| StarqlError::Date(format!("month must be 'YYYY-MM': {month_token}")))?;
    let year: i32 = year_str
        .parse()
        .map_err(|_| StarqlError::Date(format!("month must be 'YYYY-MM': {month_token}")))?;
    let month: u32 = month_str
        .parse()
        .map_err(|_| StarqlError::Date(format!("month must be 'YYYY-MM': {month_token}")))?;
    let (start, end) = month_bounds(year, month)?;
    Ok((start, end))
}

fn month_bounds(year: i32, month: u32) -> Result<(String, String)> {
    let start = make_date(year, month, 1)?;
    let end = end_of_month(year, month)?;
    Ok((start.to_string(), end.to_string()))
}

fn end_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Ok(make_date(next_year, next_month, 1)? - Duration::days(1))
}

fn make_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| StarqlError::Date(format!("invalid date: {year}-{month:02}-{day:02}")))
}

fn parse_iso(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| StarqlError::Date(format!("invalid date format: {value}")))
}

/// Result of matching a free-text phrase against the configured named ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseResolution {
    pub range_key: String,
    /// True when an unsupported span was mapped to the nearest configured
    /// range (e.g. "last 5 months" -> "last_6_months"), false for an exact
    /// keyword match or a default.
    pub auto_mapped: bool,
}

static EXPLICIT_MONTHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:last|past)\s+(\d+)\s+months?").expect("static regex"));
static BARE_MONTHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+months?").expect("static regex"));

/// Map a natural-language phrase to a configured named range, used by the
/// upstream question parser. Approximate matches pick the range whose
/// `round(days/30)` month-equivalent is closest; ties go to the first key in
/// sorted iteration order.
///
/// Returns `None` when the tenant declares no named ranges at all. Earlier
/// revisions invented a `last_12_months` key in that case; a key absent from
/// the tenant vocabulary would only fail later in the resolver, so callers
/// now get `None` and must supply their own default.
pub fn resolve_phrase(
    question: &str,
    date_ranges: &BTreeMap<String, u32>,
) -> Option<PhraseResolution> {
    if date_ranges.is_empty() {
        return None;
    }

    let q = question.to_lowercase();
    if q.trim().is_empty() {
        return first_key(date_ranges).map(exact);
    }

    // Explicit phrasing of a configured key, e.g. "last 6 months".
    for key in date_ranges.keys() {
        if q.contains(&key.replace('_', " ")) {
            return Some(exact(key.clone()));
        }
    }

    for pattern in [&EXPLICIT_MONTHS, &BARE_MONTHS] {
        if let Some(months) = capture_months(pattern, &q) {
            if let Some(key) = nearest_by_months(date_ranges, months) {
                return Some(PhraseResolution {
                    range_key: key,
                    auto_mapped: true,
                });
            }
        }
    }

    if date_ranges.len() == 1 {
        return first_key(date_ranges).map(exact);
    }
    if date_ranges.contains_key("last_6_months") {
        return Some(exact("last_6_months".to_string()));
    }
    first_key(date_ranges).map(exact)
}

fn exact(range_key: String) -> PhraseResolution {
    PhraseResolution {
        range_key,
        auto_mapped: false,
    }
}

fn first_key(date_ranges: &BTreeMap<String, u32>) -> Option<String> {
    date_ranges.keys().next().cloned()
}

fn capture_months(pattern: &Regex, question: &str) -> Option<i64> {
    pattern
        .captures(question)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .filter(|months| *months > 0)
}

fn nearest_by_months(date_ranges: &BTreeMap<String, u32>, months: i64) -> Option<String> {
    date_ranges
        .iter()
        .map(|(key, days)| {
            let equivalent = (f64::from(*days) / 30.0).round() as i64;
            ((equivalent - months).abs(), key)
        })
        .min_by_key(|(diff, _)| *diff)
        .map(|(_, key)| key.clone())
}
