use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;

pub type HabitId = i64;
pub type UserId = i64;

pub const MAX_ACTIVE_HABITS: usize = 3;
pub const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Build,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingType {
    #[default]
    Binary,
    Measured {
        target_value: Option<i64>,
        target_unit: Option<String>,
    },
}

impl TrackingType {
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary)
    }

    pub fn target_value(&self) -> Option<i64> {
        match self {
            Self::Binary => None,
            Self::Measured { target_value, .. } => *target_value,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekdays,
    Weekends,
    Custom,
    /// Unrecognised stored value; scheduled like `Daily`.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    pub name: String,
    pub emoji_buddy: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub tracking: TrackingType,
    #[serde(default)]
    pub frequency: Frequency,
    /// Sunday-first day mask, only consulted for `Frequency::Custom`.
    #[serde(default)]
    pub custom_days: Option<Vec<bool>>,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Habit {
    pub fn is_building(&self) -> bool {
        self.direction == Direction::Build
    }

    /// First calendar day counted by any streak or rate window.
    pub fn created_on(&self, calendar: &Calendar) -> NaiveDate {
        calendar.day_of(self.created_at)
    }

    pub fn days_since_creation(&self, calendar: &Calendar) -> i64 {
        calendar.days_since(self.created_on(calendar))
    }

    /// Whether a recorded outcome moves the habit forward. Breaking a habit
    /// succeeds on an explicit "did not do it"; a missing outcome never does.
    pub fn is_success(&self, completed: Option<bool>) -> bool {
        match (self.direction, completed) {
            (Direction::Build, Some(done)) => done,
            (Direction::Break, Some(done)) => !done,
            (_, None) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckIn {
    pub id: i64,
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub date: NaiveDate,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub value: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn has_entry(&self) -> bool {
        self.completed.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completed == Some(true)
    }
}
