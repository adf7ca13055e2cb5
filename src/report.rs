use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::AggregationResult;
use crate::timestamp::FeedTimestamp;

pub fn build_report(result: &AggregationResult, now: NaiveDateTime) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Feeding Report");
    let _ = writeln!(
        output,
        "Generated {} from {} recorded feedings",
        FeedTimestamp::from_naive(now),
        result.sorted_events.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Today");
    let _ = writeln!(output, "Average fed per day: {:.2}gr", result.daily_average);

    if result.today_events.is_empty() {
        let _ = writeln!(output, "You haven't fed your pet today.");
    } else {
        for event in result.today_events.iter() {
            let _ = writeln!(output, "- {}: {}gr", event.timestamp, event.grams);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Averages");

    if result.weekly_averages.is_empty() {
        let _ = writeln!(output, "No feedings recorded yet.");
    } else {
        for week in result.weekly_averages.iter() {
            let _ = writeln!(
                output,
                "- {} ({} - {}): {:.2}gr across {} feedings",
                week.week, week.start_date, week.end_date, week.average, week.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Feedings");

    if result.sorted_events.is_empty() {
        let _ = writeln!(output, "No feedings recorded yet.");
    } else {
        for event in result.sorted_events.iter().take(5) {
            let _ = writeln!(output, "- {} ({}): {}gr", event.timestamp, event.id, event.grams);
        }
    }

    if !result.rejected.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Rejected Records");
        for rejected in result.rejected.iter() {
            let _ = writeln!(output, "- {}: {}", rejected.id, rejected.reason);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::models::FeedingEvent;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    #[test]
    fn empty_history_reads_naturally() {
        let report = build_report(&aggregate(&[], now()), now());
        assert!(report.contains("Generated 01/05/2024 - 20:00 from 0 recorded feedings"));
        assert!(report.contains("Average fed per day: 0.00gr"));
        assert!(report.contains("You haven't fed your pet today."));
        assert!(!report.contains("## Rejected Records"));
    }

    #[test]
    fn lists_today_weeks_and_rejects() {
        let events = vec![
            FeedingEvent {
                id: "a".to_string(),
                timestamp: "01/05/2024 - 08:00".to_string(),
                grams: 100.0,
            },
            FeedingEvent {
                id: "b".to_string(),
                timestamp: "01/05/2024 - 18:00".to_string(),
                grams: 50.0,
            },
            FeedingEvent {
                id: "c".to_string(),
                timestamp: "yesterday".to_string(),
                grams: 20.0,
            },
        ];
        let report = build_report(&aggregate(&events, now()), now());

        assert!(report.contains("Average fed per day: 75.00gr"));
        assert!(report.contains("- 01/05/2024 - 18:00: 50gr\n- 01/05/2024 - 08:00: 100gr"));
        assert!(report.contains("- 2024-W1 (1/5/2024 - 1/5/2024): 75.00gr across 2 feedings"));
        assert!(report.contains("## Rejected Records\n- c: timestamp \"yesterday\""));
    }
}
