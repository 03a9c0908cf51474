//! Review ratings and the schedule they produce

use chrono::{DateTime, Duration, Months, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
}

/// How well a translation was remembered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    /// Show it again right away
    Again,
    Hard,
    Good,
    Easy,
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(format!("Rating must be between 1 and 4, got {}", other)),
        }
    }
}

impl Rating {
    /// Next review time for a rating given at `now`
    pub fn next_due(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Rating::Again => now,
            Rating::Hard => now + Duration::days(7),
            Rating::Good => now.checked_add_months(Months::new(1)).unwrap_or(now),
            Rating::Easy => now.checked_add_months(Months::new(2)).unwrap_or(now),
        }
    }
}
