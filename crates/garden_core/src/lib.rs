pub mod calendar;
pub mod content;
pub mod error;
pub mod habit;
pub mod milestone;
pub mod mood;
pub mod notifications;
pub mod rates;
pub mod schedule;
pub mod streak;
pub mod zone;

#[cfg(test)]
mod testing;

pub use crate::calendar::Calendar;
pub use crate::error::{GardenError, GardenResult};
pub use crate::habit::{
    CheckIn, Direction, Frequency, Habit, HabitId, TrackingType, UserId, MAX_ACTIVE_HABITS,
};
pub use crate::streak::{calculate_streak, StreakInfo};
