//! Chronological grouping of conversations for display
//!
//! Records are sorted newest first and dropped into recency buckets
//! ("Today", "Yesterday", a weekday, "Past 30 Days", a month, or a month and
//! year). Buckets appear in the order their first record is met, which after
//! the sort is also recency order.

use crate::storage::ConversationRecord;
use chrono::{DateTime, Datelike, Duration, Local, Month, NaiveDate, TimeZone, Utc, Weekday};
use std::fmt;

/// Recency bucket a record falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCategory {
    /// Same calendar day as now
    Today,
    /// The calendar day before today
    Yesterday,
    /// Earlier in the current (Sunday-started) week
    Weekday(Weekday),
    /// Within the last 30 days but before this week
    Past30Days,
    /// Earlier this calendar year
    Month(Month),
    /// A previous year
    MonthYear(Month, i32),
}

impl fmt::Display for DateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateCategory::Today => write!(f, "Today"),
            DateCategory::Yesterday => write!(f, "Yesterday"),
            DateCategory::Weekday(day) => write!(f, "{}", weekday_name(*day)),
            DateCategory::Past30Days => write!(f, "Past 30 Days"),
            DateCategory::Month(month) => write!(f, "{}", month.name()),
            DateCategory::MonthYear(month, year) => write!(f, "{} {}", month.name(), year),
        }
    }
}

/// A labeled group of records sharing a recency category
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub category: DateCategory,
    pub items: Vec<ConversationRecord>,
}

impl Bin {
    /// Display label, e.g. `"Yesterday"` or `"March 2023"`
    pub fn label(&self) -> String {
        self.category.to_string()
    }
}

/// Group records by recency relative to the local clock
pub fn bin_dates(records: &[ConversationRecord]) -> Vec<Bin> {
    bin_dates_at(records, &Local::now())
}

/// Group records by recency relative to `now`
///
/// Calendar boundaries (days, weeks, years) are evaluated in `now`'s time
/// zone. The input is not modified; calling twice yields the same bins.
///
/// # Examples
///
/// ```
/// use chathist::history::binning::bin_dates_at;
/// use chathist::storage::ConversationRecord;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
/// let mut old = ConversationRecord::new(Some("old".into()), vec![]);
/// old.timestamp = now - Duration::days(400);
/// let mut fresh = ConversationRecord::new(Some("fresh".into()), vec![]);
/// fresh.timestamp = now - Duration::hours(1);
///
/// let bins = bin_dates_at(&[old, fresh], &now);
/// let labels: Vec<String> = bins.iter().map(|b| b.label()).collect();
/// assert_eq!(labels, vec!["Today", "April 2023"]);
/// ```
pub fn bin_dates_at<Tz: TimeZone>(records: &[ConversationRecord], now: &DateTime<Tz>) -> Vec<Bin> {
    let mut sorted: Vec<&ConversationRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut bins: Vec<Bin> = Vec::new();
    for record in sorted {
        let category = date_category(&record.timestamp, now);
        match bins.iter_mut().find(|bin| bin.category == category) {
            Some(bin) => bin.items.push(record.clone()),
            None => bins.push(Bin {
                category,
                items: vec![record.clone()],
            }),
        }
    }

    bins
}

/// Categorize one instant relative to `now`; the first matching rule wins
pub fn date_category<Tz: TimeZone>(timestamp: &DateTime<Utc>, now: &DateTime<Tz>) -> DateCategory {
    let date = timestamp.with_timezone(&now.timezone()).date_naive();
    let today = now.date_naive();

    if date == today {
        return DateCategory::Today;
    }

    if today.pred_opt() == Some(date) {
        return DateCategory::Yesterday;
    }

    if week_start(date) == week_start(today) {
        return DateCategory::Weekday(date.weekday());
    }

    let thirty_days_ago = now.with_timezone(&Utc) - Duration::days(30);
    if *timestamp > thirty_days_ago {
        return DateCategory::Past30Days;
    }

    let month = month_of(date);
    if date.year() == today.year() {
        return DateCategory::Month(month);
    }

    DateCategory::MonthYear(month, date.year())
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

fn month_of(date: NaiveDate) -> Month {
    // month() is always 1..=12
    Month::try_from(date.month() as u8).unwrap_or(Month::January)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
