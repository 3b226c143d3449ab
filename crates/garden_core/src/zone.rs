use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ZoneState {
    Thriving,
    Healthy,
    Okay,
    Struggling,
    Neglected,
}

impl ZoneState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Thriving => "Thriving",
            Self::Healthy => "Healthy",
            Self::Okay => "Okay",
            Self::Struggling => "Struggling",
            Self::Neglected => "Neglected",
        }
    }

    /// Decorations scattered over a zone in this state.
    pub fn elements(&self) -> &'static [&'static str] {
        match self {
            Self::Thriving => &["🌳", "🌻", "🦋", "✨"],
            Self::Healthy => &["🌿", "🌸", "🌼"],
            Self::Okay => &["🌱", "🌾"],
            Self::Struggling => &["🍂", "🥀"],
            Self::Neglected => &["🍂", "💨", "🕸️"],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Atmosphere {
    Sunny,
    PartlyCloudy,
    Cloudy,
    Overcast,
    Rainy,
}

pub fn zone_state(rate: f64) -> ZoneState {
    if rate >= 90.0 {
        ZoneState::Thriving
    } else if rate >= 70.0 {
        ZoneState::Healthy
    } else if rate >= 50.0 {
        ZoneState::Okay
    } else if rate >= 25.0 {
        ZoneState::Struggling
    } else {
        ZoneState::Neglected
    }
}

/// Whole-garden weather. An empty garden is always cloudy.
pub fn atmosphere(average_rate: f64, habit_count: usize) -> Atmosphere {
    if habit_count == 0 {
        return Atmosphere::Cloudy;
    }
    if average_rate >= 85.0 {
        Atmosphere::Sunny
    } else if average_rate >= 70.0 {
        Atmosphere::PartlyCloudy
    } else if average_rate >= 50.0 {
        Atmosphere::Cloudy
    } else if average_rate >= 25.0 {
        Atmosphere::Overcast
    } else {
        Atmosphere::Rainy
    }
}
