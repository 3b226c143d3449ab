//! Fixtures shared by the unit tests.

use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::calendar::Calendar;
use crate::habit::{CheckIn, Direction, Frequency, Habit, TrackingType};

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn calendar(today: NaiveDate) -> Calendar {
    Calendar::utc(today)
}

/// Daily build habit created at 09:00 UTC on `created`.
pub fn habit_created(created: NaiveDate) -> Habit {
    let created_at = Utc.from_utc_datetime(&created.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
    Habit {
        id: 1,
        user_id: 1,
        name: "Stretch".into(),
        emoji_buddy: "🐈".into(),
        direction: Direction::Build,
        tracking: TrackingType::Binary,
        frequency: Frequency::Daily,
        custom_days: None,
        reminder_time: None,
        active: true,
        sort_order: 0,
        created_at,
        updated_at: created_at,
    }
}

/// Check-in recorded at noon UTC on its own date.
pub fn check_in(habit: &Habit, date: NaiveDate, completed: Option<bool>) -> CheckIn {
    let created_at = Utc.from_utc_datetime(&date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    CheckIn {
        id: i64::from(date.num_days_from_ce()),
        habit_id: habit.id,
        user_id: habit.user_id,
        date,
        completed,
        value: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn completed_on(habit: &Habit, dates: impl IntoIterator<Item = NaiveDate>) -> Vec<CheckIn> {
    dates
        .into_iter()
        .map(|date| check_in(habit, date, Some(true)))
        .collect()
}
