use std::cmp::Reverse;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use garden_core::habit::{CheckIn, Habit, HabitId, UserId};
use garden_core::milestone::{Milestone, NewMilestone};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::store::{CheckInUpsert, DateRange, GardenStore, HabitUpdate, InsertedMilestone, NewHabit, UpsertedCheckIn};

/// Serialized form of a whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub check_ins: Vec<CheckIn>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Default)]
struct Tables {
    habits: Vec<Habit>,
    check_ins: Vec<CheckIn>,
    milestones: Vec<Milestone>,
    next_id: i64,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owns(&self, user_id: UserId, habit_id: HabitId) -> bool {
        self.habits
            .iter()
            .any(|habit| habit.id == habit_id && habit.user_id == user_id)
    }
}

/// Reference `GardenStore` keeping every table in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let next_id = snapshot
            .habits
            .iter()
            .map(|habit| habit.id)
            .chain(snapshot.check_ins.iter().map(|check_in| check_in.id))
            .chain(snapshot.milestones.iter().map(|milestone| milestone.id))
            .max()
            .unwrap_or(0);
        Self {
            tables: RwLock::new(Tables {
                habits: snapshot.habits,
                check_ins: snapshot.check_ins,
                milestones: snapshot.milestones,
                next_id,
            }),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.read();
        StoreSnapshot {
            habits: tables.habits.clone(),
            check_ins: tables.check_ins.clone(),
            milestones: tables.milestones.clone(),
        }
    }
}

impl GardenStore for MemoryStore {
    fn habit(&self, user_id: UserId, habit_id: HabitId) -> Result<Option<Habit>> {
        Ok(self
            .tables
            .read()
            .habits
            .iter()
            .find(|habit| habit.id == habit_id && habit.user_id == user_id)
            .cloned())
    }

    fn habits(&self, user_id: UserId) -> Result<Vec<Habit>> {
        let mut habits: Vec<Habit> = self
            .tables
            .read()
            .habits
            .iter()
            .filter(|habit| habit.user_id == user_id)
            .cloned()
            .collect();
        habits.sort_by_key(|habit| (Reverse(habit.sort_order), Reverse(habit.created_at)));
        Ok(habits)
    }

    fn active_habits(&self, user_id: UserId) -> Result<Vec<Habit>> {
        let mut habits = self.habits(user_id)?;
        habits.retain(|habit| habit.active);
        Ok(habits)
    }

    fn check_ins(&self, user_id: UserId, habit_id: HabitId, range: DateRange) -> Result<Vec<CheckIn>> {
        let mut check_ins: Vec<CheckIn> = self
            .tables
            .read()
            .check_ins
            .iter()
            .filter(|ci| ci.user_id == user_id && ci.habit_id == habit_id && range.contains(ci.date))
            .cloned()
            .collect();
        check_ins.sort_by_key(|ci| Reverse(ci.date));
        Ok(check_ins)
    }

    fn check_ins_for_user(&self, user_id: UserId, range: DateRange) -> Result<Vec<CheckIn>> {
        let mut check_ins: Vec<CheckIn> = self
            .tables
            .read()
            .check_ins
            .iter()
            .filter(|ci| ci.user_id == user_id && range.contains(ci.date))
            .cloned()
            .collect();
        check_ins.sort_by_key(|ci| Reverse(ci.date));
        Ok(check_ins)
    }

    fn milestones_for_habit(&self, user_id: UserId, habit_id: HabitId) -> Result<Vec<Milestone>> {
        Ok(self
            .tables
            .read()
            .milestones
            .iter()
            .filter(|milestone| milestone.user_id == user_id && milestone.habit_id == habit_id)
            .cloned()
            .collect())
    }

    fn milestones_for_user(&self, user_id: UserId) -> Result<Vec<Milestone>> {
        Ok(self
            .tables
            .read()
            .milestones
            .iter()
            .filter(|milestone| milestone.user_id == user_id)
            .cloned()
            .collect())
    }

    fn upsert_check_in(&self, upsert: CheckInUpsert) -> Result<UpsertedCheckIn> {
        let mut tables = self.tables.write();
        if !tables.owns(upsert.user_id, upsert.habit_id) {
            return Err(anyhow!("habit {} is not owned by user {}", upsert.habit_id, upsert.user_id));
        }
        if let Some(existing) = tables
            .check_ins
            .iter_mut()
            .find(|ci| ci.habit_id == upsert.habit_id && ci.date == upsert.date)
        {
            existing.completed = upsert.completed.or(existing.completed);
            existing.value = upsert.value.or(existing.value);
            existing.updated_at = upsert.at;
            return Ok(UpsertedCheckIn {
                check_in: existing.clone(),
                created: false,
            });
        }
        let check_in = CheckIn {
            id: tables.allocate_id(),
            habit_id: upsert.habit_id,
            user_id: upsert.user_id,
            date: upsert.date,
            completed: Some(upsert.completed.unwrap_or(false)),
            value: upsert.value,
            created_at: upsert.at,
            updated_at: upsert.at,
        };
        tables.check_ins.push(check_in.clone());
        Ok(UpsertedCheckIn {
            check_in,
            created: true,
        })
    }

    fn insert_milestone(&self, milestone: NewMilestone, earned_at: DateTime<Utc>) -> Result<InsertedMilestone> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables
            .milestones
            .iter()
            .find(|m| m.habit_id == milestone.habit_id && m.kind == milestone.kind)
        {
            return Ok(InsertedMilestone {
                milestone: existing.clone(),
                created: false,
            });
        }
        let stored = Milestone {
            id: tables.allocate_id(),
            habit_id: milestone.habit_id,
            user_id: milestone.user_id,
            kind: milestone.kind,
            cosmetic: milestone.cosmetic,
            streak_snapshot: milestone.streak_snapshot,
            earned_at,
        };
        tables.milestones.push(stored.clone());
        Ok(InsertedMilestone {
            milestone: stored,
            created: true,
        })
    }

    fn insert_habit(&self, habit: NewHabit) -> Result<Habit> {
        let mut tables = self.tables.write();
        let stored = Habit {
            id: tables.allocate_id(),
            user_id: habit.user_id,
            name: habit.name,
            emoji_buddy: habit.emoji_buddy,
            direction: habit.direction,
            tracking: habit.tracking,
            frequency: habit.frequency,
            custom_days: Some(habit.custom_days),
            reminder_time: habit.reminder_time,
            active: true,
            sort_order: habit.sort_order,
            created_at: habit.created_at,
            updated_at: habit.created_at,
        };
        tables.habits.push(stored.clone());
        Ok(stored)
    }

    fn update_habit(
        &self,
        user_id: UserId,
        habit_id: HabitId,
        update: &HabitUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Habit>> {
        let mut tables = self.tables.write();
        Ok(tables
            .habits
            .iter_mut()
            .find(|habit| habit.id == habit_id && habit.user_id == user_id)
            .map(|habit| {
                update.apply(habit, at);
                habit.clone()
            }))
    }

    fn set_active(
        &self,
        user_id: UserId,
        habit_id: HabitId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Habit>> {
        let mut tables = self.tables.write();
        Ok(tables
            .habits
            .iter_mut()
            .find(|habit| habit.id == habit_id && habit.user_id == user_id)
            .map(|habit| {
                habit.active = active;
                habit.updated_at = at;
                habit.clone()
            }))
    }

    fn delete_habit(&self, user_id: UserId, habit_id: HabitId) -> Result<bool> {
        let mut tables = self.tables.write();
        if !tables.owns(user_id, habit_id) {
            return Ok(false);
        }
        tables.habits.retain(|habit| habit.id != habit_id);
        tables.check_ins.retain(|ci| ci.habit_id != habit_id);
        tables.milestones.retain(|milestone| milestone.habit_id != habit_id);
        Ok(true)
    }
}
