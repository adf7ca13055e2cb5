//! Decoding feeding history out of database exports and CSV files.

use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{DailyGramsRecord, FeedingEvent};

/// Accepts a full database export, the `dailyGrams` collection alone, or
/// `null` for a collection that does not exist yet.
pub fn parse_export(json: &str) -> Result<Vec<FeedingEvent>, ValidationError> {
    let root: Value = serde_json::from_str(json)?;

    let collection = match root.pointer("/feedingData/dailyGrams") {
        Some(inner) => Some(inner),
        None if root.get("feedingData").is_some() => None,
        None => Some(&root),
    };

    let entries = match collection {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ValidationError::NotAnObject("dailyGrams".to_string())),
    };

    let mut events = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        if !entry.is_object() {
            return Err(ValidationError::NotAnObject(key.clone()));
        }
        let record: DailyGramsRecord = serde_json::from_value(entry.clone())?;
        events.push(record.into_event(key)?);
    }

    Ok(events)
}

pub fn read_export(path: &Path) -> anyhow::Result<Vec<FeedingEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_export(&raw).with_context(|| format!("failed to decode {}", path.display()))
}

pub fn read_csv(path: &Path) -> anyhow::Result<Vec<FeedingEvent>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: Option<String>,
        date: String,
        grams: f64,
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut events = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let id = row
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        events.push(FeedingEvent {
            id,
            timestamp: row.date,
            grams: row.grams,
        });
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_full_tree_export() {
        let json = r#"{
            "commands": {"dispense": false},
            "feedingData": {
                "dailyAverage": 42,
                "dailyGrams": {
                    "-Na1": {"feedTimeId": "a1", "date": "01/05/2024 - 08:00", "value": 30},
                    "-Nb2": {"feedTimeId": "b2", "date": "01/05/2024 - 18:00", "value": 45.5}
                }
            }
        }"#;
        let events = parse_export(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "a1");
        assert_eq!(events[1].grams, 45.5);
    }

    #[test]
    fn reads_records_carrying_both_id_keys() {
        let json = r#"{"-Nk": {"id":"x","feedTimeId":"x","date":"01/05/2024 - 08:00","value":30}}"#;
        let events = parse_export(json).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "x");
        assert_eq!(events[0].grams, 30.0);
    }

    #[test]
    fn reads_bare_collection_and_null() {
        let json = r#"{"k1": {"date": "01/05/2024 - 08:00", "value": 30}}"#;
        let events = parse_export(json).unwrap();
        assert_eq!(events[0].id, "k1");

        assert!(parse_export("null").unwrap().is_empty());
        assert!(parse_export(r#"{"feedingData": {"dailyAverage": 0}}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rejects_records_without_dates() {
        let json = r#"{"k1": {"feedTimeId": "k1", "value": 30}}"#;
        assert!(matches!(
            parse_export(json),
            Err(ValidationError::MissingField { field: "date", .. })
        ));
    }

    #[test]
    fn rejects_scalar_entries() {
        assert!(matches!(
            parse_export(r#"{"k1": 30}"#),
            Err(ValidationError::NotAnObject(key)) if key == "k1"
        ));
    }

    #[test]
    fn csv_rows_without_ids_get_generated_ones() {
        let path = std::env::temp_dir().join(format!("feeder-{}.csv", Uuid::new_v4()));
        std::fs::write(
            &path,
            "id,date,grams\nabc,01/05/2024 - 08:00,30\n,01/05/2024 - 09:00,40\n",
        )
        .unwrap();
        let events = read_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "abc");
        assert!(events[1].id.starts_with("import-"));
        assert_eq!(events[1].timestamp, "01/05/2024 - 09:00");
    }
}
