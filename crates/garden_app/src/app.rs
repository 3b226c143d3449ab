use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use garden_core::calendar::parse_day;
use garden_core::content::MessageKind;
use garden_core::habit::{Habit, HabitId, UserId};
use garden_core::rates::HabitStats;
use garden_core::{Calendar, StreakInfo};
use garden_service::requests::{CheckInRequest, ContentRequest};
use garden_service::{GardenService, MemoryStore, StoreSnapshot};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data: Option<PathBuf>,
    pub(crate) zone: Tz,
    pub(crate) user_id: UserId,
    pub(crate) today: Option<NaiveDate>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `GARDEN_*` settings through `lookup`. An unknown zone or user
    /// is ignored; a malformed `GARDEN_TODAY` is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup("GARDEN_DATA") {
            if !path.trim().is_empty() {
                config.data = Some(PathBuf::from(path));
            }
        }
        if let Some(zone) = lookup("GARDEN_TIMEZONE") {
            match zone.trim().parse::<Tz>() {
                Ok(value) => config.zone = value,
                Err(err) => warn!(%zone, %err, "ignoring unknown timezone"),
            }
        }
        if let Some(user) = lookup("GARDEN_USER") {
            if let Ok(value) = user.trim().parse::<UserId>() {
                config.user_id = value;
            }
        }
        if let Some(today) = lookup("GARDEN_TODAY") {
            let day = parse_day(&today)
                .ok_or_else(|| anyhow!("GARDEN_TODAY must be YYYY-MM-DD, got `{today}`"))?;
            config.today = Some(day);
        }
        Ok(config)
    }

    pub fn with_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.data = Some(path.into());
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn calendar(&self) -> Calendar {
        match self.today {
            Some(today) => Calendar::new(today, self.zone),
            None => Calendar::now(self.zone),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: None,
            zone: Tz::UTC,
            user_id: 1,
            today: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Garden,
    Habits,
    Stats,
    Content { habit_id: HabitId, kind: MessageKind },
    CheckIn { habit_id: HabitId, completed: bool },
}

impl Command {
    /// `garden`, `habits`, `stats`, `content <habit_id> [type]`,
    /// `check-in <habit_id> [done|missed]`. No arguments shows the garden.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|arg| arg.as_ref().to_string()).collect();
        let habit_id = |index: usize| -> Result<HabitId> {
            let raw = args
                .get(index)
                .ok_or_else(|| anyhow!("missing habit id"))?;
            raw.parse()
                .with_context(|| format!("habit id must be numeric, got `{raw}`"))
        };
        match args.first().map(String::as_str) {
            None | Some("garden") => Ok(Self::Garden),
            Some("habits") => Ok(Self::Habits),
            Some("stats") => Ok(Self::Stats),
            Some("content") => Ok(Self::Content {
                habit_id: habit_id(1)?,
                kind: match args.get(2) {
                    Some(kind) => kind.parse()?,
                    None => MessageKind::default(),
                },
            }),
            Some("check-in") => Ok(Self::CheckIn {
                habit_id: habit_id(1)?,
                completed: match args.get(2).map(String::as_str) {
                    None | Some("done") => true,
                    Some("missed") => false,
                    Some(other) => bail!("expected `done` or `missed`, got `{other}`"),
                },
            }),
            Some(other) => bail!("unknown command `{other}`"),
        }
    }
}

#[derive(Debug, Serialize)]
struct HabitReport {
    habit: Habit,
    streak: StreakInfo,
    stats: HabitStats,
}

pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: StoreSnapshot =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    debug!(
        habits = snapshot.habits.len(),
        check_ins = snapshot.check_ins.len(),
        milestones = snapshot.milestones.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Executes `command` against the configured snapshot and returns the JSON to print.
pub fn run(config: &AppConfig, command: &Command) -> Result<String> {
    let snapshot = match &config.data {
        Some(path) if path.exists() => load_snapshot(path)?,
        Some(path) => {
            info!(path = %path.display(), "snapshot missing, starting empty");
            StoreSnapshot::default()
        }
        None => StoreSnapshot::default(),
    };
    let store = Arc::new(MemoryStore::from_snapshot(snapshot));
    let service = GardenService::builder()
        .with_store(store.clone())
        .with_timezone(config.zone)
        .build();
    let calendar = config.calendar();
    let user = config.user_id;

    let output = match command {
        Command::Garden => serde_json::to_string_pretty(&service.garden(user, &calendar)?)?,
        Command::Habits => {
            let mut reports = Vec::new();
            for habit in service.list_habits(user)? {
                let streak = service.streak(user, habit.id, &calendar)?;
                let stats = service.habit_stats(user, habit.id, &calendar)?;
                reports.push(HabitReport { habit, streak, stats });
            }
            serde_json::to_string_pretty(&reports)?
        }
        Command::Stats => serde_json::to_string_pretty(&service.global_stats(user, &calendar)?)?,
        Command::Content { habit_id, kind } => {
            let request = ContentRequest::new(*habit_id, *kind);
            serde_json::to_string_pretty(&service.content(user, &request, &calendar)?)?
        }
        Command::CheckIn { habit_id, completed } => {
            let request = CheckInRequest {
                habit_id: *habit_id,
                completed: Some(*completed),
                value: None,
            };
            let outcome = service.check_in(user, &request, &calendar)?;
            match &config.data {
                Some(path) => save_snapshot(path, &store.snapshot())?,
                None => warn!("no GARDEN_DATA set, check-in is not persisted"),
            }
            serde_json::to_string_pretty(&outcome)?
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_shows_the_garden() {
        assert_eq!(Command::from_args(Vec::<String>::new()).unwrap(), Command::Garden);
    }

    #[test]
    fn parses_content_and_check_in() {
        assert_eq!(
            Command::from_args(["content", "4", "habit_science"]).unwrap(),
            Command::Content {
                habit_id: 4,
                kind: MessageKind::HabitScience
            }
        );
        assert_eq!(
            Command::from_args(["check-in", "2", "missed"]).unwrap(),
            Command::CheckIn {
                habit_id: 2,
                completed: false
            }
        );
        assert!(Command::from_args(["check-in"]).is_err());
        assert!(Command::from_args(["content", "x"]).is_err());
        assert!(Command::from_args(["water"]).is_err());
    }

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn config_reads_every_setting() {
        let config = AppConfig::from_lookup(vars(&[
            ("GARDEN_DATA", "/tmp/garden.json"),
            ("GARDEN_TIMEZONE", "Asia/Tokyo"),
            ("GARDEN_USER", "7"),
            ("GARDEN_TODAY", "2025-06-20"),
        ]))
        .unwrap();
        assert_eq!(config.data, Some(PathBuf::from("/tmp/garden.json")));
        assert_eq!(config.zone, Tz::Asia__Tokyo);
        assert_eq!(config.user_id, 7);
        assert_eq!(config.today, NaiveDate::from_ymd_opt(2025, 6, 20));
    }

    #[test]
    fn malformed_today_is_an_error() {
        let err = AppConfig::from_lookup(vars(&[
            ("GARDEN_DATA", "/tmp/garden.json"),
            ("GARDEN_TODAY", "20/06/2025"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("GARDEN_TODAY"));
    }

    #[test]
    fn unknown_zone_keeps_utc() {
        let config = AppConfig::from_lookup(vars(&[("GARDEN_TIMEZONE", "Mars/Olympus")])).unwrap();
        assert_eq!(config.zone, Tz::UTC);
        assert!(config.data.is_none());
    }
}
