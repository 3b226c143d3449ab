use std::sync::Arc;

use chrono::{DateTime, Utc};
use garden_core::habit::{Habit, HabitId, UserId};
use garden_core::notifications::NotificationMessage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRequest {
    pub user_id: UserId,
    /// `None` for garden-wide messages such as re-engagement and the weekly summary.
    pub habit_id: Option<HabitId>,
    pub message: NotificationMessage,
    pub scheduled_for: DateTime<Utc>,
}

/// Delivery adapters (push, email) implement this trait.
pub trait NotificationSink: Send + Sync {
    fn schedule(&self, notification: NotificationRequest);
    fn clear_for_habit(&self, habit: &Habit);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn schedule(&self, notification: NotificationRequest) {
        (**self).schedule(notification);
    }

    fn clear_for_habit(&self, habit: &Habit) {
        (**self).clear_for_habit(habit);
    }
}

/// Sink that keeps everything it is handed; useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    scheduled: Mutex<Vec<NotificationRequest>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<NotificationRequest> {
        self.scheduled.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn schedule(&self, notification: NotificationRequest) {
        self.scheduled.lock().push(notification);
    }

    fn clear_for_habit(&self, habit: &Habit) {
        self.scheduled
            .lock()
            .retain(|notification| notification.habit_id != Some(habit.id));
    }
}
