//! Publish-month derivation.

use chrono::{Datelike, NaiveDate};

/// First day of the month `date` falls in.
///
/// This is the value the pipeline stores in `publish_month` (`YYYY-MM-01`), so
/// the map server can filter alerts with monthly granularity.
pub fn publish_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
