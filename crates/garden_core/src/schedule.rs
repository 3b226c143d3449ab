use chrono::{Datelike, NaiveDate};

use crate::calendar::days_between;
use crate::habit::{Frequency, Habit};

/// Whether `date` is one of the habit's scheduled days.
pub fn is_tracked_day(habit: &Habit, date: NaiveDate) -> bool {
    let day_of_week = date.weekday().num_days_from_sunday() as usize;
    match habit.frequency {
        Frequency::Daily | Frequency::Other => true,
        Frequency::Weekdays => (1..=5).contains(&day_of_week),
        Frequency::Weekends => day_of_week == 0 || day_of_week == 6,
        Frequency::Custom => habit
            .custom_days
            .as_ref()
            .and_then(|days| days.get(day_of_week).copied())
            .unwrap_or(false),
    }
}

/// Number of tracked days in the inclusive range.
pub fn count_tracked_days(habit: &Habit, from: NaiveDate, to: NaiveDate) -> usize {
    days_between(from, to)
        .filter(|day| is_tracked_day(habit, *day))
        .count()
}
