use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::habit::{CheckIn, Habit, HabitId};
use crate::rates::{days_in_trailing_window, seven_day_rate};

/// New habits show the settling-in mood for this many days.
pub const GRACE_PERIOD_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Ecstatic,
    Happy,
    Content,
    Neutral,
    Sad,
    VerySad,
    Dormant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    Bounce,
    Pulse,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoodResult {
    pub mood: Mood,
    pub emoji: String,
    pub label: String,
    pub animation: Animation,
}

impl MoodResult {
    fn new(mood: Mood, emoji: &str, label: &str, animation: Animation) -> Self {
        Self {
            mood,
            emoji: emoji.to_string(),
            label: label.to_string(),
            animation,
        }
    }

    pub fn settling_in() -> Self {
        Self::new(Mood::Content, "😊", "Settling In", Animation::Pulse)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitMood {
    pub habit_id: HabitId,
    pub mood: MoodResult,
    pub completion_rate_7_days: f64,
    pub days_tracked: u32,
}

pub fn mood_from_rate(rate: f64) -> MoodResult {
    if rate >= 100.0 {
        MoodResult::new(Mood::Ecstatic, "🤩", "On Fire!", Animation::Bounce)
    } else if rate >= 85.0 {
        MoodResult::new(Mood::Happy, "😄", "Thriving", Animation::Pulse)
    } else if rate >= 70.0 {
        MoodResult::new(Mood::Content, "😊", "Growing", Animation::Pulse)
    } else if rate >= 50.0 {
        MoodResult::new(Mood::Neutral, "😐", "Getting There", Animation::None)
    } else if rate >= 25.0 {
        MoodResult::new(Mood::Sad, "😟", "Struggling", Animation::None)
    } else if rate > 0.0 {
        MoodResult::new(Mood::VerySad, "😢", "Needs Love", Animation::None)
    } else {
        MoodResult::new(Mood::Dormant, "😴", "Dormant", Animation::None)
    }
}

pub fn habit_mood(habit: &Habit, check_ins: &[CheckIn], calendar: &Calendar) -> HabitMood {
    let completion_rate_7_days = seven_day_rate(habit, check_ins, calendar);
    let mood = if habit.days_since_creation(calendar) < GRACE_PERIOD_DAYS {
        MoodResult::settling_in()
    } else {
        mood_from_rate(completion_rate_7_days)
    };
    HabitMood {
        habit_id: habit.id,
        mood,
        completion_rate_7_days,
        days_tracked: days_in_trailing_window(habit, 7, calendar),
    }
}
