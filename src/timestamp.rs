//! Local date-time value for the feeder's stored timestamp format.
//!
//! The device writes every dispense as `MM/DD/YYYY - HH:MM` in its local
//! timezone (24h clock, zero-padded fields). [`FeedTimestamp`] only accepts
//! that exact shape and rejects anything that is not a real calendar moment.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::TimestampError;

const SEPARATOR: &str = " - ";
const DATE_LAYOUT: &[u8] = b"NN/NN/NNNN";
const TIME_LAYOUT: &[u8] = b"NN:NN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedTimestamp(NaiveDateTime);

impl FeedTimestamp {
    pub fn parse(raw: &str) -> Result<Self, TimestampError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TimestampError::Empty);
        }

        let (date_part, time_part) = trimmed
            .split_once(SEPARATOR)
            .ok_or_else(|| TimestampError::Layout(raw.to_string()))?;

        if !matches_layout(date_part, DATE_LAYOUT) || !matches_layout(time_part, TIME_LAYOUT) {
            return Err(TimestampError::Layout(raw.to_string()));
        }

        let date = NaiveDate::parse_from_str(date_part, "%m/%d/%Y")
            .map_err(|_| TimestampError::OutOfRange(raw.to_string()))?;
        let time = NaiveTime::parse_from_str(time_part, "%H:%M")
            .map_err(|_| TimestampError::OutOfRange(raw.to_string()))?;

        Ok(Self(date.and_time(time)))
    }

    /// Truncates to minute precision, the resolution the device stores.
    pub fn from_naive(value: NaiveDateTime) -> Self {
        let value = value
            .with_second(0)
            .and_then(|v| v.with_nanosecond(0))
            .unwrap_or(value);
        Self(value)
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.0.time()
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

/// Renders a date as `M/D/YYYY` without zero padding.
pub fn format_short_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

fn matches_layout(value: &str, layout: &[u8]) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == layout.len()
        && bytes.iter().zip(layout).all(|(b, l)| match l {
            b'N' => b.is_ascii_digit(),
            other => b == other,
        })
}

impl fmt::Display for FeedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%m/%d/%Y - %H:%M"))
    }
}

impl FromStr for FeedTimestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
