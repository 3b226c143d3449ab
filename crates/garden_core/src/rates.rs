//! Trailing-window completion rates.
//!
//! Two families of windows coexist. The analytics windows (7/30/90 days,
//! all-time) divide by the window length and select check-ins by their
//! creation timestamp. The garden windows (`seven_day_rate`,
//! `fourteen_day_rate`) walk calendar days bounded by the habit's creation day.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::habit::{CheckIn, Habit, HabitId};
use crate::schedule::is_tracked_day;
use crate::streak::outcomes_by_day;

/// Stand-in window for the all-time average of measured habits.
pub const MEASURED_ALL_TIME_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CompletionRate {
    pub rate: u32,
    pub completed: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MeasuredRate {
    /// Rounded average value, compared against the target by the caller.
    pub rate: i64,
    pub average_value: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowRate {
    Binary(CompletionRate),
    Measured(MeasuredRate),
}

impl WindowRate {
    pub fn rate(&self) -> i64 {
        match self {
            Self::Binary(rate) => i64::from(rate.rate),
            Self::Measured(rate) => rate.rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitStats {
    pub habit_id: HabitId,
    pub completion_rate_7d: WindowRate,
    pub completion_rate_30d: WindowRate,
    pub completion_rate_90d: WindowRate,
    pub completion_rate_all_time: WindowRate,
    pub average_value: Option<f64>,
    pub target_value: Option<i64>,
}

/// Which days inside a trailing window are expected to carry a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedDays {
    AllDays,
    Scheduled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct GardenAverage {
    pub average: f64,
    pub habit_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GlobalStats {
    pub total_check_ins: u32,
    pub overall_completion_rate: u32,
    pub combined_streak: u32,
    pub habit_count: usize,
}

fn in_window<'a>(
    check_ins: &'a [CheckIn],
    window_days: i64,
    calendar: &'a Calendar,
) -> impl Iterator<Item = &'a CheckIn> + 'a {
    let start = calendar.days_ago(window_days);
    check_ins.iter().filter(move |check_in| {
        let recorded = calendar.day_of(check_in.created_at);
        recorded >= start && recorded <= calendar.today()
    })
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

pub fn completion_rate(check_ins: &[CheckIn], window_days: i64, calendar: &Calendar) -> CompletionRate {
    let completed = in_window(check_ins, window_days, calendar)
        .filter(|check_in| check_in.is_completed())
        .count() as u32;
    let total = window_days.max(0) as u32;
    CompletionRate {
        rate: percent(f64::from(completed), f64::from(total)).round() as u32,
        completed,
        total,
    }
}

pub fn measured_rate(check_ins: &[CheckIn], window_days: i64, calendar: &Calendar) -> MeasuredRate {
    let values: Vec<i64> = in_window(check_ins, window_days, calendar)
        .filter_map(|check_in| check_in.value)
        .collect();
    if values.is_empty() {
        return MeasuredRate::default();
    }
    let average = values.iter().sum::<i64>() as f64 / values.len() as f64;
    MeasuredRate {
        rate: average.round() as i64,
        average_value: (average * 10.0).round() / 10.0,
    }
}

pub fn window_rate(habit: &Habit, check_ins: &[CheckIn], window_days: i64, calendar: &Calendar) -> WindowRate {
    if habit.tracking.is_binary() {
        WindowRate::Binary(completion_rate(check_ins, window_days, calendar))
    } else {
        WindowRate::Measured(measured_rate(check_ins, window_days, calendar))
    }
}

pub fn all_time_rate(habit: &Habit, check_ins: &[CheckIn], calendar: &Calendar) -> WindowRate {
    if habit.tracking.is_binary() {
        let days = habit.days_since_creation(calendar).max(0);
        WindowRate::Binary(completion_rate(check_ins, days, calendar))
    } else {
        WindowRate::Measured(measured_rate(check_ins, MEASURED_ALL_TIME_DAYS, calendar))
    }
}

pub fn habit_stats(habit: &Habit, check_ins: &[CheckIn], calendar: &Calendar) -> HabitStats {
    let average_value = (!habit.tracking.is_binary())
        .then(|| measured_rate(check_ins, 30, calendar).average_value);
    HabitStats {
        habit_id: habit.id,
        completion_rate_7d: window_rate(habit, check_ins, 7, calendar),
        completion_rate_30d: window_rate(habit, check_ins, 30, calendar),
        completion_rate_90d: window_rate(habit, check_ins, 90, calendar),
        completion_rate_all_time: all_time_rate(habit, check_ins, calendar),
        average_value,
        target_value: habit.tracking.target_value(),
    }
}

/// Percentage of completed days among the last `days` days (today included)
/// that fall on or after the habit's creation day.
pub fn trailing_rate(
    habit: &Habit,
    check_ins: &[CheckIn],
    days: i64,
    calendar: &Calendar,
    tracked: TrackedDays,
) -> f64 {
    let outcomes = outcomes_by_day(check_ins);
    let created_on = habit.created_on(calendar);

    let mut completed_days = 0u32;
    let mut total_days = 0u32;
    for offset in 0..days {
        let date = calendar.days_ago(offset);
        if date < created_on {
            continue;
        }
        if tracked == TrackedDays::Scheduled && !is_tracked_day(habit, date) {
            continue;
        }
        total_days += 1;
        if outcomes.get(&date).copied().unwrap_or(false) {
            completed_days += 1;
        }
    }
    percent(f64::from(completed_days), f64::from(total_days))
}

/// Days counted by [`seven_day_rate`], used as the mood's "days tracked".
pub fn days_in_trailing_window(habit: &Habit, days: i64, calendar: &Calendar) -> u32 {
    let created_on = habit.created_on(calendar);
    (0..days)
        .filter(|offset| calendar.days_ago(*offset) >= created_on)
        .count() as u32
}

pub fn seven_day_rate(habit: &Habit, check_ins: &[CheckIn], calendar: &Calendar) -> f64 {
    trailing_rate(habit, check_ins, 7, calendar, TrackedDays::AllDays)
}

pub fn fourteen_day_rate(habit: &Habit, check_ins: &[CheckIn], calendar: &Calendar) -> f64 {
    trailing_rate(habit, check_ins, 14, calendar, TrackedDays::Scheduled)
}

/// Mean 14-day rate across the given habits.
pub fn average_fourteen_day_rate<'a>(
    habits: impl IntoIterator<Item = (&'a Habit, &'a [CheckIn])>,
    calendar: &Calendar,
) -> GardenAverage {
    let rates: Vec<f64> = habits
        .into_iter()
        .map(|(habit, check_ins)| fourteen_day_rate(habit, check_ins, calendar))
        .collect();
    if rates.is_empty() {
        return GardenAverage::default();
    }
    GardenAverage {
        average: rates.iter().sum::<f64>() / rates.len() as f64,
        habit_count: rates.len(),
    }
}

/// Week-level summary across a user's active habits.
pub fn global_stats(habits: &[Habit], check_ins: &[CheckIn], calendar: &Calendar) -> GlobalStats {
    if habits.is_empty() {
        return GlobalStats::default();
    }

    let total_check_ins = check_ins.iter().filter(|ci| ci.is_completed()).count() as u32;
    let weekly: Vec<&CheckIn> = in_window(check_ins, 7, calendar)
        .filter(|ci| ci.is_completed())
        .collect();
    let possible = (habits.len() * 7) as f64;
    let overall_completion_rate = percent(weekly.len() as f64, possible).round() as u32;

    let mut per_day: HashMap<_, usize> = HashMap::new();
    for check_in in &weekly {
        *per_day.entry(check_in.date).or_default() += 1;
    }
    let combined_streak = (0..7)
        .map(|offset| calendar.days_ago(offset))
        .take_while(|date| per_day.get(date).copied() == Some(habits.len()))
        .count() as u32;

    GlobalStats {
        total_check_ins,
        overall_completion_rate,
        combined_streak,
        habit_count: habits.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{Frequency, TrackingType};
    use crate::testing::{calendar, check_in, completed_on, day, habit_created};
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        // A Friday.
        day(2025, 6, 20)
    }

    fn days_ago(days: i64) -> NaiveDate {
        today() - Duration::days(days)
    }

    #[test]
    fn flat_window_uses_window_length_as_denominator() {
        let mut habit = habit_created(days_ago(60));
        habit.frequency = Frequency::Weekdays;
        let check_ins = completed_on(&habit, (0..5).map(days_ago));
        let rate = completion_rate(&check_ins, 7, &calendar(today()));
        assert_eq!(rate, CompletionRate { rate: 71, completed: 5, total: 7 });
    }

    #[test]
    fn flat_window_selects_by_creation_timestamp() {
        let habit = habit_created(days_ago(60));
        // Backfilled row dated long ago but recorded yesterday still counts.
        let mut backfilled = check_in(&habit, days_ago(40), Some(true));
        backfilled.created_at = check_in(&habit, days_ago(1), None).created_at;
        let stale = check_in(&habit, days_ago(8), Some(true));
        let rate = completion_rate(&[backfilled, stale], 7, &calendar(today()));
        assert_eq!(rate.completed, 1);
    }

    #[test]
    fn zero_window_rate_is_zero() {
        let habit = habit_created(today());
        let check_ins = completed_on(&habit, [today()]);
        let rate = completion_rate(&check_ins, 0, &calendar(today()));
        assert_eq!(rate, CompletionRate { rate: 0, completed: 1, total: 0 });
    }

    #[test]
    fn measured_rate_averages_present_values() {
        let mut habit = habit_created(days_ago(60));
        habit.tracking = TrackingType::Measured {
            target_value: Some(8),
            target_unit: Some("glasses".into()),
        };
        let mut check_ins: Vec<CheckIn> = [(0, Some(7)), (1, Some(8)), (2, None), (3, Some(8))]
            .into_iter()
            .map(|(offset, value)| {
                let mut ci = check_in(&habit, days_ago(offset), Some(true));
                ci.value = value;
                ci
            })
            .collect();
        let rate = measured_rate(&check_ins, 7, &calendar(today()));
        assert_eq!(rate.rate, 8);
        assert!((rate.average_value - 7.7).abs() < 1e-9);

        check_ins.retain(|ci| ci.value.is_none());
        assert_eq!(measured_rate(&check_ins, 7, &calendar(today())), MeasuredRate::default());
    }

    #[test]
    fn stats_dispatch_on_tracking_type() {
        let habit = habit_created(days_ago(9));
        let check_ins = completed_on(&habit, (0..3).map(days_ago));
        let stats = habit_stats(&habit, &check_ins, &calendar(today()));
        assert_eq!(stats.average_value, None);
        assert_eq!(
            stats.completion_rate_all_time,
            WindowRate::Binary(CompletionRate { rate: 33, completed: 3, total: 9 })
        );
        assert_eq!(stats.completion_rate_30d.rate(), 10);

        let mut measured = habit.clone();
        measured.tracking = TrackingType::Measured { target_value: Some(20), target_unit: None };
        let stats = habit_stats(&measured, &check_ins, &calendar(today()));
        assert!(matches!(stats.completion_rate_7d, WindowRate::Measured(_)));
        assert_eq!(stats.target_value, Some(20));
        assert_eq!(stats.average_value, Some(0.0));
    }

    #[test]
    fn fourteen_day_rate_respects_schedule_and_creation() {
        let mut habit = habit_created(days_ago(60));
        habit.frequency = Frequency::Weekdays;
        // Ten weekdays in the last fourteen days; complete five of them.
        let check_ins = completed_on(&habit, (0..5).map(days_ago));
        let rate = fourteen_day_rate(&habit, &check_ins, &calendar(today()));
        assert!((rate - 50.0).abs() < 1e-9);

        let young = habit_created(days_ago(1));
        let check_ins = completed_on(&young, [today()]);
        let rate = fourteen_day_rate(&young, &check_ins, &calendar(today()));
        assert!((rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn seven_day_rate_ignores_schedule() {
        let mut habit = habit_created(days_ago(60));
        habit.frequency = Frequency::Weekends;
        let check_ins = completed_on(&habit, [days_ago(0), days_ago(1)]);
        let rate = seven_day_rate(&habit, &check_ins, &calendar(today()));
        assert!((rate - 200.0 / 7.0).abs() < 1e-9);
        assert_eq!(days_in_trailing_window(&habit, 7, &calendar(today())), 7);
        assert_eq!(days_in_trailing_window(&habit_created(days_ago(2)), 7, &calendar(today())), 3);
    }

    #[test]
    fn average_over_no_habits_is_zero() {
        let average = average_fourteen_day_rate(std::iter::empty(), &calendar(today()));
        assert_eq!(average, GardenAverage { average: 0.0, habit_count: 0 });
    }

    #[test]
    fn average_over_habits() {
        let full = habit_created(days_ago(60));
        let full_check_ins = completed_on(&full, (0..14).map(days_ago));
        let mut empty = habit_created(days_ago(60));
        empty.id = 2;
        let average = average_fourteen_day_rate(
            [(&full, full_check_ins.as_slice()), (&empty, &[][..])],
            &calendar(today()),
        );
        assert_eq!(average.habit_count, 2);
        assert!((average.average - 50.0).abs() < 1e-9);
    }

    #[test]
    fn global_stats_combined_streak() {
        let first = habit_created(days_ago(30));
        let mut second = habit_created(days_ago(30));
        second.id = 2;
        let mut check_ins = completed_on(&first, (0..4).map(days_ago));
        check_ins.extend(completed_on(&second, (0..2).map(days_ago)));
        let stats = global_stats(&[first, second], &check_ins, &calendar(today()));
        assert_eq!(stats.total_check_ins, 6);
        assert_eq!(stats.combined_streak, 2);
        assert_eq!(stats.overall_completion_rate, 43);
        assert_eq!(stats.habit_count, 2);
        assert_eq!(global_stats(&[], &check_ins, &calendar(today())), GlobalStats::default());
    }
}
