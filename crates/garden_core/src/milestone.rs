use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, HabitId, UserId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MilestoneKind {
    #[serde(rename = "streak_7")]
    Streak7,
    #[serde(rename = "streak_30")]
    Streak30,
    #[serde(rename = "streak_100")]
    Streak100,
}

impl MilestoneKind {
    /// Ascending by threshold.
    pub const ALL: [MilestoneKind; 3] = [Self::Streak7, Self::Streak30, Self::Streak100];

    pub fn threshold(&self) -> u32 {
        match self {
            Self::Streak7 => 7,
            Self::Streak30 => 30,
            Self::Streak100 => 100,
        }
    }

    pub fn category(&self) -> CosmeticCategory {
        match self {
            Self::Streak7 => CosmeticCategory::Hat,
            Self::Streak30 => CosmeticCategory::Companion,
            Self::Streak100 => CosmeticCategory::Landmark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streak7 => "streak_7",
            Self::Streak30 => "streak_30",
            Self::Streak100 => "streak_100",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CosmeticCategory {
    Hat,
    Companion,
    Landmark,
}

impl CosmeticCategory {
    pub fn pool(&self) -> &'static [&'static str] {
        match self {
            Self::Hat => &["🎩", "🕶️", "👑", "🎀", "🧢", "🎪", "🌸", "🌺"],
            Self::Companion => &["🐕", "🐈", "🐦", "🐿️", "🦊", "🐸", "🐢", "🦋"],
            Self::Landmark => &["🏰", "🌈", "⛲", "🎪", "🗿", "🎠", "🌻", "🌲"],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cosmetic {
    #[serde(rename = "type")]
    pub category: CosmeticCategory,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: i64,
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub kind: MilestoneKind,
    pub cosmetic: Cosmetic,
    pub streak_snapshot: u32,
    pub earned_at: DateTime<Utc>,
}

/// A milestone earned by the current check, not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMilestone {
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub kind: MilestoneKind,
    pub cosmetic: Cosmetic,
    pub streak_snapshot: u32,
}

/// Picks a symbol the user does not own yet in `category`; once the pool is
/// exhausted any symbol may repeat.
pub fn choose_cosmetic<R: Rng + ?Sized>(
    category: CosmeticCategory,
    owned: &HashSet<&str>,
    rng: &mut R,
) -> String {
    let pool = category.pool();
    let available: Vec<&str> = pool
        .iter()
        .copied()
        .filter(|symbol| !owned.contains(symbol))
        .collect();
    let candidates = if available.is_empty() { pool } else { &available[..] };
    candidates
        .choose(rng)
        .map(|symbol| symbol.to_string())
        .unwrap_or_default()
}

/// Milestones newly reached by `current_streak`.
///
/// `user_milestones` holds everything the user has earned across all habits:
/// entries for this habit decide which kinds are already taken, the rest
/// steer cosmetic choice away from duplicates. Calling again with the same
/// inputs plus the returned milestones yields nothing.
pub fn check_milestones<R: Rng + ?Sized>(
    habit: &Habit,
    user_milestones: &[Milestone],
    current_streak: u32,
    rng: &mut R,
) -> Vec<NewMilestone> {
    let earned: HashSet<MilestoneKind> = user_milestones
        .iter()
        .filter(|milestone| milestone.habit_id == habit.id)
        .map(|milestone| milestone.kind)
        .collect();

    let mut fresh = Vec::new();
    for kind in MilestoneKind::ALL {
        if current_streak < kind.threshold() || earned.contains(&kind) {
            continue;
        }
        let category = kind.category();
        let owned: HashSet<&str> = user_milestones
            .iter()
            .map(|milestone| &milestone.cosmetic)
            .filter(|cosmetic| cosmetic.category == category)
            .map(|cosmetic| cosmetic.value.as_str())
            .collect();
        let value = choose_cosmetic(category, &owned, rng);
        tracing::debug!(habit_id = habit.id, kind = kind.as_str(), %value, "milestone reached");
        fresh.push(NewMilestone {
            habit_id: habit.id,
            user_id: habit.user_id,
            kind,
            cosmetic: Cosmetic { category, value },
            streak_snapshot: current_streak,
        });
    }
    fresh
}

pub fn milestone_message(kind: MilestoneKind, buddy: &str, cosmetic: &str) -> String {
    match kind {
        MilestoneKind::Streak7 => format!("🔥 7 days straight! {buddy} earned a {cosmetic}!"),
        MilestoneKind::Streak30 => format!("⭐ 30 days! {buddy} made a new friend: {cosmetic}!"),
        MilestoneKind::Streak100 => {
            format!("🏆 100 DAYS! {buddy} built something amazing: {cosmetic}!")
        }
    }
}
