use std::collections::HashMap;

use garden_core::calendar::Calendar;
use garden_core::habit::HabitId;
use garden_core::streak::StreakInfo;
use parking_lot::RwLock;

/// Streak results memoized per habit for the calendar they were computed
/// with. A different day or a different zone misses.
#[derive(Debug, Default)]
pub struct StreakCache {
    entries: RwLock<HashMap<HabitId, (Calendar, StreakInfo)>>,
}

impl StreakCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, habit_id: HabitId, calendar: &Calendar) -> Option<StreakInfo> {
        self.entries
            .read()
            .get(&habit_id)
            .filter(|(computed_with, _)| computed_with == calendar)
            .map(|(_, info)| info.clone())
    }

    pub fn insert(&self, habit_id: HabitId, calendar: &Calendar, info: StreakInfo) {
        self.entries.write().insert(habit_id, (*calendar, info));
    }

    pub fn invalidate(&self, habit_id: HabitId) {
        if self.entries.write().remove(&habit_id).is_some() {
            tracing::debug!(habit_id, "streak cache entry dropped");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
