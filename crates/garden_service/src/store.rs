use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use garden_core::habit::{CheckIn, Direction, Frequency, Habit, HabitId, TrackingType, UserId};
use garden_core::milestone::{Milestone, NewMilestone};
use serde::{Deserialize, Serialize};

/// Inclusive date bounds; a missing side is open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(from: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHabit {
    pub user_id: UserId,
    pub name: String,
    pub emoji_buddy: String,
    pub direction: Direction,
    pub tracking: TrackingType,
    pub frequency: Frequency,
    pub custom_days: Vec<bool>,
    pub reminder_time: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Mutable habit settings. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitUpdate {
    pub name: Option<String>,
    pub reminder_time: Option<String>,
    pub frequency: Option<Frequency>,
    pub custom_days: Option<Vec<bool>>,
    pub sort_order: Option<i32>,
}

impl HabitUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, habit: &mut Habit, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            habit.name = name.clone();
        }
        if let Some(reminder_time) = &self.reminder_time {
            habit.reminder_time = Some(reminder_time.clone());
        }
        if let Some(frequency) = self.frequency {
            habit.frequency = frequency;
        }
        if let Some(custom_days) = &self.custom_days {
            habit.custom_days = Some(custom_days.clone());
        }
        if let Some(sort_order) = self.sort_order {
            habit.sort_order = sort_order;
        }
        habit.updated_at = now;
    }
}

/// Check-in write keyed by habit and date. On an existing row, absent fields
/// keep their stored value; a new row records a missing outcome as not done.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInUpsert {
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub completed: Option<bool>,
    pub value: Option<i64>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpsertedCheckIn {
    pub check_in: CheckIn,
    pub created: bool,
}

/// `created` is `false` when the habit already held a milestone of that kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsertedMilestone {
    pub milestone: Milestone,
    pub created: bool,
}

/// Persistence collaborator. Every query is scoped to the owning user.
pub trait GardenStore: Send + Sync {
    fn habit(&self, user_id: UserId, habit_id: HabitId) -> Result<Option<Habit>>;

    /// Newest sort order first, then newest creation.
    fn habits(&self, user_id: UserId) -> Result<Vec<Habit>>;

    fn active_habits(&self, user_id: UserId) -> Result<Vec<Habit>>;

    fn check_ins(&self, user_id: UserId, habit_id: HabitId, range: DateRange) -> Result<Vec<CheckIn>>;

    /// Check-ins across all of the user's habits, newest date first.
    fn check_ins_for_user(&self, user_id: UserId, range: DateRange) -> Result<Vec<CheckIn>>;

    fn milestones_for_habit(&self, user_id: UserId, habit_id: HabitId) -> Result<Vec<Milestone>>;

    fn milestones_for_user(&self, user_id: UserId) -> Result<Vec<Milestone>>;

    fn upsert_check_in(&self, upsert: CheckInUpsert) -> Result<UpsertedCheckIn>;

    fn insert_milestone(&self, milestone: NewMilestone, earned_at: DateTime<Utc>) -> Result<InsertedMilestone>;

    fn insert_habit(&self, habit: NewHabit) -> Result<Habit>;

    fn update_habit(
        &self,
        user_id: UserId,
        habit_id: HabitId,
        update: &HabitUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Habit>>;

    fn set_active(
        &self,
        user_id: UserId,
        habit_id: HabitId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Habit>>;

    /// Removes the habit with its check-ins and milestones.
    fn delete_habit(&self, user_id: UserId, habit_id: HabitId) -> Result<bool>;
}
