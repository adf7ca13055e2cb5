use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One dispense recorded by the feeder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingEvent {
    pub id: String,
    /// Stored as written by the device, `MM/DD/YYYY - HH:MM`.
    pub timestamp: String,
    pub grams: f64,
}

/// A `feedingData/dailyGrams` entry exactly as the device stores it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGramsRecord {
    #[serde(default)]
    pub feed_time_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl DailyGramsRecord {
    /// The id is `feedTimeId`, then `id`, then `key` (the record's key in the tree).
    pub fn into_event(self, key: &str) -> Result<FeedingEvent, ValidationError> {
        let id = self
            .feed_time_id
            .filter(|id| !id.is_empty())
            .or(self.id.filter(|id| !id.is_empty()))
            .unwrap_or_else(|| key.to_string());
        let timestamp = self.date.ok_or_else(|| ValidationError::MissingField {
            record: id.clone(),
            field: "date",
        })?;
        let grams = self.value.ok_or_else(|| ValidationError::MissingField {
            record: id.clone(),
            field: "value",
        })?;

        Ok(FeedingEvent {
            id,
            timestamp,
            grams,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAverage {
    /// Non-ISO key, `YYYY-W<n>`.
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub average: f64,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedEvent {
    pub id: String,
    pub timestamp: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub sorted_events: Vec<FeedingEvent>,
    pub today_events: Vec<FeedingEvent>,
    pub daily_average: f64,
    pub weekly_averages: Vec<WeeklyAverage>,
    pub rejected: Vec<RejectedEvent>,
}
