//! Parsing and validation of caller input, ahead of any calculation.

use chrono::{DateTime, NaiveTime, Utc};
use garden_core::calendar::parse_day;
use garden_core::content::{ContentContext, ContentOptions, MessageKind, Trigger};
use garden_core::habit::{Direction, Frequency, HabitId, TrackingType, UserId, MAX_NAME_LEN};
use garden_core::{GardenError, GardenResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::{DateRange, HabitUpdate, NewHabit};

fn parse_id(raw: &str, field: &str) -> GardenResult<HabitId> {
    raw.trim()
        .parse::<HabitId>()
        .map_err(|_| GardenError::invalid(format!("{field} must be numeric, got `{raw}`")))
}

fn parse_flag(raw: Option<&str>) -> bool {
    raw == Some("true")
}

fn from_json<T: DeserializeOwned>(body: &str) -> GardenResult<T> {
    serde_json::from_str(body).map_err(|err| GardenError::invalid(err.to_string()))
}

fn lookup<'a>(pairs: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub habit_id: HabitId,
    pub kind: MessageKind,
    pub options: ContentOptions,
}

impl ContentRequest {
    pub fn new(habit_id: HabitId, kind: MessageKind) -> Self {
        Self {
            habit_id,
            kind,
            options: ContentOptions::default(),
        }
    }

    /// Builds a request from query-string pairs: `habit_id` (required),
    /// `type`, `trigger`, `context`, `just_checked_in`, `was_broken`.
    pub fn from_query<'a>(query: impl IntoIterator<Item = (&'a str, &'a str)>) -> GardenResult<Self> {
        let pairs: Vec<(&str, &str)> = query.into_iter().collect();
        let habit_id = lookup(&pairs, "habit_id")
            .ok_or_else(|| GardenError::invalid("habit_id is required"))
            .and_then(|raw| parse_id(raw, "habit_id"))?;
        let kind = lookup(&pairs, "type")
            .map(str::parse::<MessageKind>)
            .transpose()?
            .unwrap_or_default();
        let trigger = lookup(&pairs, "trigger").map(str::parse::<Trigger>).transpose()?;
        let context = lookup(&pairs, "context")
            .map(str::parse::<ContentContext>)
            .transpose()?;
        Ok(Self {
            habit_id,
            kind,
            options: ContentOptions {
                trigger,
                context,
                just_checked_in: parse_flag(lookup(&pairs, "just_checked_in")),
                was_broken: parse_flag(lookup(&pairs, "was_broken")),
            },
        })
    }
}

/// Today's check-in for one habit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckInRequest {
    pub habit_id: HabitId,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub value: Option<i64>,
}

impl CheckInRequest {
    pub fn from_json(body: &str) -> GardenResult<Self> {
        from_json(body)
    }
}

/// Filters for listing past check-ins: `habit_id`, `from`, `to`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRequest {
    pub habit_id: Option<HabitId>,
    pub range: DateRange,
}

impl HistoryRequest {
    pub fn from_query<'a>(query: impl IntoIterator<Item = (&'a str, &'a str)>) -> GardenResult<Self> {
        let pairs: Vec<(&str, &str)> = query.into_iter().collect();
        let habit_id = lookup(&pairs, "habit_id")
            .map(|raw| parse_id(raw, "habit_id"))
            .transpose()?;
        let day = |key: &str| {
            lookup(&pairs, key)
                .map(|raw| {
                    parse_day(raw)
                        .ok_or_else(|| GardenError::invalid(format!("{key} must be YYYY-MM-DD, got `{raw}`")))
                })
                .transpose()
        };
        Ok(Self {
            habit_id,
            range: DateRange {
                from: day("from")?,
                to: day("to")?,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingKind {
    #[default]
    Binary,
    Measured,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewHabitRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub emoji_buddy: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(rename = "type", default)]
    pub kind: TrackingKind,
    #[serde(default)]
    pub target_value: Option<i64>,
    #[serde(default)]
    pub target_unit: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub custom_days: Option<Vec<bool>>,
    #[serde(default)]
    pub reminder_time: Option<String>,
}

impl NewHabitRequest {
    pub fn from_json(body: &str) -> GardenResult<Self> {
        from_json(body)
    }

    /// Checks the request and turns it into a row for `user_id`.
    pub fn validate(self, user_id: UserId, sort_order: i32, now: DateTime<Utc>) -> GardenResult<NewHabit> {
        let name = validate_name(&self.name)?;
        let emoji_buddy = self.emoji_buddy.trim().to_string();
        if emoji_buddy.is_empty() {
            return Err(GardenError::invalid("name and emoji are required"));
        }
        let custom_days = match self.custom_days {
            Some(days) => validate_custom_days(days)?,
            None => vec![false; 7],
        };
        if let Some(time) = &self.reminder_time {
            validate_reminder_time(time)?;
        }
        let tracking = match self.kind {
            TrackingKind::Binary => TrackingType::Binary,
            TrackingKind::Measured => TrackingType::Measured {
                target_value: self.target_value,
                target_unit: self.target_unit,
            },
        };
        Ok(NewHabit {
            user_id,
            name,
            emoji_buddy,
            direction: self.direction,
            tracking,
            frequency: self.frequency,
            custom_days,
            reminder_time: self.reminder_time,
            sort_order,
            created_at: now,
        })
    }
}

/// Settings a habit may change after creation. The buddy, the direction and
/// the tracking type are fixed; naming any of them is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HabitUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub custom_days: Option<Vec<bool>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji_buddy: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<serde_json::Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<serde_json::Value>,
}

impl HabitUpdateRequest {
    pub fn from_json(body: &str) -> GardenResult<Self> {
        from_json(body)
    }

    pub fn validate(self) -> GardenResult<HabitUpdate> {
        if self.emoji_buddy.is_some() {
            return Err(GardenError::ProtectedField("emoji_buddy"));
        }
        if self.direction.is_some() {
            return Err(GardenError::ProtectedField("direction"));
        }
        if self.kind.is_some() {
            return Err(GardenError::ProtectedField("type"));
        }
        let name = self.name.as_deref().map(validate_name).transpose()?;
        if let Some(time) = &self.reminder_time {
            validate_reminder_time(time)?;
        }
        let custom_days = self.custom_days.map(validate_custom_days).transpose()?;
        Ok(HabitUpdate {
            name,
            reminder_time: self.reminder_time,
            frequency: self.frequency,
            custom_days,
            sort_order: self.sort_order,
        })
    }
}

fn validate_name(raw: &str) -> GardenResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GardenError::invalid("name and emoji are required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GardenError::invalid(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_custom_days(days: Vec<bool>) -> GardenResult<Vec<bool>> {
    if days.len() != 7 {
        return Err(GardenError::invalid(format!(
            "custom_days needs 7 entries, got {}",
            days.len()
        )));
    }
    Ok(days)
}

fn validate_reminder_time(raw: &str) -> GardenResult<()> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(|_| ())
        .map_err(|_| GardenError::invalid(format!("reminder_time must be HH:MM, got `{raw}`")))
}
