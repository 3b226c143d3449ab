use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reminder,
    Missed,
    Streak,
    Reengagement,
    WeeklySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationMessage {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl NotificationKind {
    /// `(title, body)` pairs with `{key}` placeholders.
    pub fn templates(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Reminder => &[
                ("Time to check in!", "{buddy} is waiting for you today 🌱"),
                ("Hey, {buddy} misses you!", "Don't forget to check in today"),
                ("Quick check-in?", "{habit_name} is just one tap away"),
            ],
            Self::Missed => &[
                ("Still time!", "{habit_name} is waiting for you today"),
                ("Don't break the streak", "You're at {streak} days, keep it going!"),
            ],
            Self::Streak => &[
                ("🎉 Amazing!", "{streak} days straight! You earned a {reward}!"),
                ("🔥 On fire!", "{streak} days! {buddy} is so proud!"),
            ],
            Self::Reengagement => &[
                ("Your garden misses you 🌱", "Your buddies are getting lonely"),
                ("We miss you!", "Come back to your garden, it's not the same without you"),
            ],
            Self::WeeklySummary => &[(
                "📊 Weekly Summary",
                "This week: {summary}, your garden is looking good!",
            )],
        }
    }

    /// Picks one template of this kind at random and fills in `vars`.
    pub fn render<R: Rng + ?Sized>(&self, vars: &[(&str, &str)], rng: &mut R) -> NotificationMessage {
        let (title, body) = self
            .templates()
            .choose(rng)
            .copied()
            .unwrap_or(("", ""));
        NotificationMessage {
            kind: *self,
            title: substitute(title, vars),
            body: substitute(body, vars),
        }
    }
}

fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}

pub fn reminder<R: Rng + ?Sized>(habit_name: &str, buddy: &str, rng: &mut R) -> NotificationMessage {
    NotificationKind::Reminder.render(&[("habit_name", habit_name), ("buddy", buddy)], rng)
}

pub fn missed<R: Rng + ?Sized>(habit_name: &str, streak: u32, rng: &mut R) -> NotificationMessage {
    let streak = streak.to_string();
    NotificationKind::Missed.render(&[("habit_name", habit_name), ("streak", streak.as_str())], rng)
}

pub fn streak_celebration<R: Rng + ?Sized>(
    streak: u32,
    reward: &str,
    buddy: &str,
    rng: &mut R,
) -> NotificationMessage {
    let streak = streak.to_string();
    NotificationKind::Streak.render(
        &[("streak", streak.as_str()), ("reward", reward), ("buddy", buddy)],
        rng,
    )
}

pub fn reengagement<R: Rng + ?Sized>(rng: &mut R) -> NotificationMessage {
    NotificationKind::Reengagement.render(&[], rng)
}

pub fn weekly_summary<R: Rng + ?Sized>(summary: &str, rng: &mut R) -> NotificationMessage {
    NotificationKind::WeeklySummary.render(&[("summary", summary)], rng)
}
