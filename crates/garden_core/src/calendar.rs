use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The reference calendar for one request.
///
/// Every calculation receives the same `Calendar`, so "today" is decided once
/// and a request spanning midnight cannot mix two different days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Calendar {
    today: NaiveDate,
    zone: Tz,
}

impl Calendar {
    pub fn new(today: NaiveDate, zone: Tz) -> Self {
        Self { today, zone }
    }

    pub fn utc(today: NaiveDate) -> Self {
        Self::new(today, Tz::UTC)
    }

    pub fn at(now: DateTime<Utc>, zone: Tz) -> Self {
        Self {
            today: now.with_timezone(&zone).date_naive(),
            zone,
        }
    }

    pub fn now(zone: Tz) -> Self {
        Self::at(Utc::now(), zone)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Calendar day of a stored timestamp in the reference zone.
    pub fn day_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        timestamp.with_timezone(&self.zone).date_naive()
    }

    pub fn days_ago(&self, days: i64) -> NaiveDate {
        self.today - Duration::days(days)
    }

    /// Whole days from `since` up to today; negative when `since` is in the future.
    pub fn days_since(&self, since: NaiveDate) -> i64 {
        (self.today - since).num_days()
    }

    pub fn is_today(&self, date: NaiveDate) -> bool {
        date == self.today
    }
}

/// Parse a `YYYY-MM-DD` calendar day.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Inclusive day iterator, empty when `from > to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |day| *day <= to)
}
