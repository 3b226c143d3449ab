use thiserror::Error;

use crate::habit::HabitId;

pub type GardenResult<T> = Result<T, GardenError>;

/// Failures surfaced to the caller. Degenerate data (no check-ins, no habits)
/// is never an error; every calculation has an explicit zero result for it.
#[derive(Debug, Error)]
pub enum GardenError {
    #[error("habit {habit_id} not found")]
    NotFound { habit_id: HabitId },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("maximum of {limit} active habits allowed, archive an existing habit first")]
    HabitLimit { limit: usize },
    #[error("`{0}` cannot be changed after creation")]
    ProtectedField(&'static str),
    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
}

impl GardenError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
