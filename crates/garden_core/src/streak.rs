use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{days_between, Calendar};
use crate::habit::{CheckIn, Habit};
use crate::schedule::{count_tracked_days, is_tracked_day};

/// Upper bound of the backward walk; a current streak never exceeds this.
pub const MAX_STREAK_LOOKBACK_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StreakInfo {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_check_ins: u32,
    pub completion_rate: u32,
    pub last_check_in_date: Option<NaiveDate>,
    pub is_active_today: bool,
}

/// Recorded outcome per day. Rows without an outcome are left out, so a
/// `None` check-in behaves exactly like a missing one.
pub(crate) fn outcomes_by_day(check_ins: &[CheckIn]) -> BTreeMap<NaiveDate, bool> {
    check_ins
        .iter()
        .filter_map(|check_in| check_in.completed.map(|done| (check_in.date, done)))
        .collect()
}

pub fn calculate_streak(habit: &Habit, check_ins: &[CheckIn], calendar: &Calendar) -> StreakInfo {
    let outcomes = outcomes_by_day(check_ins);
    let today = calendar.today();

    let total_check_ins = check_ins
        .iter()
        .filter(|check_in| habit.is_success(check_in.completed))
        .count() as u32;

    let expected_days = count_tracked_days(habit, habit.created_on(calendar), today);
    let completion_rate = if expected_days > 0 {
        (f64::from(total_check_ins) / expected_days as f64 * 100.0).round() as u32
    } else {
        0
    };

    StreakInfo {
        current_streak: current_streak(habit, &outcomes, calendar),
        longest_streak: longest_streak(habit, &outcomes, calendar),
        total_check_ins,
        completion_rate,
        last_check_in_date: check_ins.iter().map(|check_in| check_in.date).max(),
        is_active_today: outcomes.contains_key(&today),
    }
}

/// Walks back from today. Today itself never breaks the streak: an open or
/// failed day is simply not counted yet.
fn current_streak(habit: &Habit, outcomes: &BTreeMap<NaiveDate, bool>, calendar: &Calendar) -> u32 {
    let mut streak = 0;
    for offset in 0..MAX_STREAK_LOOKBACK_DAYS {
        let date = calendar.today() - Duration::days(offset);
        if !is_tracked_day(habit, date) {
            continue;
        }
        match outcomes.get(&date) {
            Some(done) if habit.is_success(Some(*done)) => streak += 1,
            _ if calendar.is_today(date) => {}
            _ => break,
        }
    }
    streak
}

/// Longest run over the whole history, from the first recorded outcome through today.
fn longest_streak(habit: &Habit, outcomes: &BTreeMap<NaiveDate, bool>, calendar: &Calendar) -> u32 {
    let start = outcomes
        .keys()
        .next()
        .copied()
        .unwrap_or_else(|| calendar.today());

    let mut longest = 0;
    let mut run = 0;
    for date in days_between(start, calendar.today()) {
        if !is_tracked_day(habit, date) {
            continue;
        }
        if outcomes.get(&date).is_some_and(|done| habit.is_success(Some(*done))) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}
