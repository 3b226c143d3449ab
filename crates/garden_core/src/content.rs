//! Motivational content: trigger/context classification and message rotation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::GardenError;
use crate::habit::{Direction, HabitId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    FirstSteps,
    BuildingMomentum,
    StreakBroken,
    HittingWall,
    LongTerm,
    BreakingBadEarly,
    BreakingBadUrge,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentContext {
    StreakActive,
    JustCheckedIn,
    Comeback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    HabitScience,
    #[default]
    Encouragement,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstSteps => "first_steps",
            Self::BuildingMomentum => "building_momentum",
            Self::StreakBroken => "streak_broken",
            Self::HittingWall => "hitting_wall",
            Self::LongTerm => "long_term",
            Self::BreakingBadEarly => "breaking_bad_early",
            Self::BreakingBadUrge => "breaking_bad_urge",
        }
    }

    pub fn messages(&self) -> &'static [&'static str] {
        match self {
            Self::FirstSteps => &[
                "New habits start small. Tie this one to something you already do every day and let the old routine carry the new one.",
                "The first week is about showing up, not about doing it perfectly. A two-minute version still counts.",
                "Making the cue obvious helps: put what you need for this habit where you will see it.",
                "Early repetitions build the path. Each check-in makes the next one a little more automatic.",
            ],
            Self::BuildingMomentum => &[
                "Habits strengthen through repetition in a stable context. Same time, same place keeps the loop tight.",
                "You are past the hardest part: starting. Momentum now does some of the work for you.",
                "Rewarding yourself right after the habit helps your brain remember why it is worth repeating.",
                "Tracking progress is itself motivating. Every mark on the calendar is evidence of who you are becoming.",
            ],
            Self::StreakBroken => &[
                "Missing once has little effect on forming a habit. Missing twice starts a new pattern, so today matters.",
                "A broken streak is data, not a verdict. What got in the way, and how can you plan around it next time?",
                "Lower the bar for today. The goal is to get back on track, not to make up for lost days.",
                "Most people who build lasting habits restart many times. Coming back is the skill.",
            ],
            Self::HittingWall => &[
                "Around the second and third week novelty fades. Boredom is a sign the habit is becoming ordinary.",
                "When motivation dips, rely on the plan: when, where and how you will do it.",
                "Professionals stick to the schedule when it is dull. That is what separates a habit from a phase.",
                "Try a small variation to keep things interesting while keeping the core routine the same.",
            ],
            Self::LongTerm => &[
                "After a month of repetitions the habit is starting to run on autopilot. Protect the cue that triggers it.",
                "Long streaks are built from ordinary days. Keep the routine simple enough to survive busy weeks.",
                "This habit is becoming part of your identity. You are someone who does this.",
                "Consider stacking a new small habit on top of this one; stable habits make great anchors.",
            ],
            Self::BreakingBadEarly => &[
                "Breaking a habit starts with its cues. Notice when and where the urge shows up.",
                "Make the habit harder to reach. Adding a little friction removes many automatic repeats.",
                "Urges rise and fall like waves. Most pass within a few minutes if you do not act on them.",
                "Replace, don't just remove: pick something to do instead when the craving hits.",
            ],
            Self::BreakingBadUrge => &[
                "An urge is not a command. Name it, wait it out, and watch it fade.",
                "Cravings are strongest when you are tired, hungry or stressed. Take care of those first.",
                "Each time you ride out an urge, the link between cue and habit gets weaker.",
                "A slip does not erase your progress. Get back to your plan at the very next chance.",
            ],
        }
    }
}

impl ContentContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreakActive => "streak_active",
            Self::JustCheckedIn => "just_checked_in",
            Self::Comeback => "comeback",
        }
    }

    pub fn templates(&self) -> &'static [&'static str] {
        match self {
            Self::StreakActive => &[
                "{streak} days and counting! {buddy} is cheering for {habit_name}.",
                "You have kept {habit_name} going for {streak} days. Your best run is {best_streak}.",
                "{buddy} loves the routine: {completion_7d}% this week.",
                "Day {days_since_start} of {habit_name}, and {total_checkins} check-ins so far.",
            ],
            Self::JustCheckedIn => &[
                "Nice work! {habit_name} is done for today. {buddy} is happy.",
                "That makes {streak} in a row. Keep it up!",
                "Checked in! {completion_30d}% over the last month.",
                "{total_checkins} check-ins and growing. {buddy} is proud of you.",
            ],
            Self::Comeback => &[
                "Welcome back! {buddy} missed you. Every streak starts with day one.",
                "Fresh start for {habit_name}. Your best streak was {best_streak} days, you can get there again.",
                "One check-in at a time. {buddy} is ready when you are.",
                "Coming back is what counts. {habit_name} is waiting.",
            ],
        }
    }
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HabitScience => "habit_science",
            Self::Encouragement => "encouragement",
        }
    }
}

macro_rules! impl_from_str {
    ($ty:ty, $what:literal, [$($variant:ident),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = GardenError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                [$(<$ty>::$variant),+]
                    .into_iter()
                    .find(|candidate| candidate.as_str() == raw)
                    .ok_or_else(|| GardenError::invalid(format!("unknown {} `{}`", $what, raw)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_from_str!(Trigger, "trigger", [
    FirstSteps,
    BuildingMomentum,
    StreakBroken,
    HittingWall,
    LongTerm,
    BreakingBadEarly,
    BreakingBadUrge,
]);
impl_from_str!(ContentContext, "context", [StreakActive, JustCheckedIn, Comeback]);
impl_from_str!(MessageKind, "message type", [HabitScience, Encouragement]);

pub fn determine_trigger(
    direction: Direction,
    days_since_start: i64,
    current_streak: u32,
    was_broken: bool,
) -> Trigger {
    let breaking = direction == Direction::Break;
    if was_broken {
        return if breaking {
            Trigger::BreakingBadUrge
        } else {
            Trigger::StreakBroken
        };
    }
    if breaking {
        return if days_since_start <= 7 {
            Trigger::BreakingBadEarly
        } else {
            Trigger::BreakingBadUrge
        };
    }
    match current_streak {
        0 if days_since_start <= 3 => Trigger::FirstSteps,
        1..=13 => Trigger::BuildingMomentum,
        14..=29 => Trigger::HittingWall,
        _ => Trigger::LongTerm,
    }
}

pub fn determine_context(current_streak: u32, just_checked_in: bool, was_broken: bool) -> ContentContext {
    if just_checked_in {
        if was_broken || current_streak == 1 {
            return ContentContext::Comeback;
        }
        return ContentContext::JustCheckedIn;
    }
    if current_streak > 0 {
        ContentContext::StreakActive
    } else {
        ContentContext::Comeback
    }
}

/// Rotation state for message pools, keyed by habit and category.
pub trait CursorStore: Send + Sync {
    /// Returns the index to show now and moves the cursor one step forward,
    /// wrapping at `pool_len`.
    fn advance(&self, habit_id: HabitId, category: &str, pool_len: usize) -> usize;
}

/// Process-local cursors; they start over when the process restarts.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursors: RwLock<HashMap<(HabitId, String), usize>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, habit_id: HabitId, category: &str) -> usize {
        self.cursors
            .read()
            .get(&(habit_id, category.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl CursorStore for MemoryCursorStore {
    fn advance(&self, habit_id: HabitId, category: &str, pool_len: usize) -> usize {
        if pool_len == 0 {
            return 0;
        }
        let mut cursors = self.cursors.write();
        let cursor = cursors.entry((habit_id, category.to_string())).or_insert(0);
        let current = *cursor % pool_len;
        *cursor = (current + 1) % pool_len;
        current
    }
}

/// Values substituted into encouragement templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TemplateVars {
    pub streak: u32,
    pub habit_name: String,
    pub buddy: String,
    pub completion_7d: u32,
    pub completion_30d: u32,
    pub days_since_start: i64,
    pub best_streak: u32,
    pub total_checkins: u32,
}

impl TemplateVars {
    pub fn render(&self, template: &str) -> String {
        [
            ("{streak}", self.streak.to_string()),
            ("{habit_name}", self.habit_name.clone()),
            ("{buddy}", self.buddy.clone()),
            ("{completion_7d}", self.completion_7d.to_string()),
            ("{completion_30d}", self.completion_30d.to_string()),
            ("{days_since_start}", self.days_since_start.to_string()),
            ("{best_streak}", self.best_streak.to_string()),
            ("{total_checkins}", self.total_checkins.to_string()),
        ]
        .iter()
        .fold(template.to_string(), |text, (key, value)| text.replace(key, value))
    }
}

/// Everything the selector needs to know about a habit.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSubject {
    pub habit_id: HabitId,
    pub direction: Direction,
    pub vars: TemplateVars,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentOptions {
    pub trigger: Option<Trigger>,
    pub context: Option<ContentContext>,
    pub just_checked_in: bool,
    pub was_broken: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContentContext>,
}

fn next_in_pool(
    cursors: &dyn CursorStore,
    habit_id: HabitId,
    category: &str,
    pool: &[&'static str],
) -> &'static str {
    let index = cursors.advance(habit_id, category, pool.len());
    pool.get(index).copied().unwrap_or_default()
}

pub fn select_content(
    cursors: &dyn CursorStore,
    subject: &ContentSubject,
    kind: MessageKind,
    options: &ContentOptions,
) -> ContentMessage {
    let vars = &subject.vars;
    match kind {
        MessageKind::HabitScience => {
            let trigger = options.trigger.unwrap_or_else(|| {
                determine_trigger(
                    subject.direction,
                    vars.days_since_start,
                    vars.streak,
                    options.was_broken,
                )
            });
            let category = format!("science_{trigger}");
            let message = next_in_pool(cursors, subject.habit_id, &category, trigger.messages());
            ContentMessage {
                kind,
                message: message.to_string(),
                trigger: Some(trigger),
                context: None,
            }
        }
        MessageKind::Encouragement => {
            let context = options.context.unwrap_or_else(|| {
                determine_context(vars.streak, options.just_checked_in, options.was_broken)
            });
            let category = format!("encouragement_{context}");
            let template = next_in_pool(cursors, subject.habit_id, &category, context.templates());
            ContentMessage {
                kind,
                message: vars.render(template),
                trigger: None,
                context: Some(context),
            }
        }
    }
}
