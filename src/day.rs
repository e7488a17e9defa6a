use chrono::{Duration, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical calendar day used for deduplication and streaks.
///
/// Serialized as `YYYY-MM-DD`. Days are taken from the caller's local wall clock,
/// never from a UTC slice of the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today in the server's local time zone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Today for a caller at the given UTC offset, or the server's zone when absent.
    pub fn today_at(offset: Option<FixedOffset>) -> Self {
        match offset {
            Some(offset) => Self(Utc::now().with_timezone(&offset).date_naive()),
            None => Self::today(),
        }
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Saturates at the earliest representable date.
    pub fn days_ago(self, days: i64) -> Self {
        Self(
            self.0
                .checked_sub_signed(Duration::days(days))
                .unwrap_or(NaiveDate::MIN),
        )
    }

    /// `None` past the last representable date.
    pub fn next(self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("expected a YYYY-MM-DD date, got {0:?}")]
pub struct DayParseError(String);

impl FromStr for DayKey {
    type Err = DayParseError;

    /// Accepts plain four-digit years only; chrono's signed extended years are rejected.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let shaped = value.len() == 10
            && value
                .bytes()
                .enumerate()
                .all(|(index, byte)| match index {
                    4 | 7 => byte == b'-',
                    _ => byte.is_ascii_digit(),
                });
        if !shaped {
            return Err(DayParseError(value.to_string()));
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DayParseError(value.to_string()))
    }
}

/// Parses an offset expressed in minutes east of UTC, as sent by browsers.
pub fn parse_offset_minutes(value: &str) -> Option<FixedOffset> {
    let minutes = value.trim().parse::<i32>().ok()?;
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}
