//! Feeding history aggregation: today's feedings, the daily average and a
//! per-week breakdown.
//!
//! Everything here is a pure function of the events and the supplied `now`.
//! Bad records degrade their own contribution and never fail the call.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::models::{AggregationResult, FeedingEvent, RejectedEvent, WeeklyAverage};
use crate::timestamp::{format_short_date, FeedTimestamp};

struct WeekBucket {
    key: String,
    grams: RunningMean,
    earliest: NaiveDate,
    latest: NaiveDate,
}

pub fn aggregate(events: &[FeedingEvent], now: NaiveDateTime) -> AggregationResult {
    let today = now.date();
    let mut rejected = Vec::new();

    let parsed: Vec<(Option<FeedTimestamp>, &FeedingEvent)> = events
        .iter()
        .map(|event| match FeedTimestamp::parse(&event.timestamp) {
            Ok(ts) => (Some(ts), event),
            Err(err) => {
                warn!(id = %event.id, timestamp = %event.timestamp, error = %err, "skipping unparseable feeding timestamp");
                rejected.push(RejectedEvent {
                    id: event.id.clone(),
                    timestamp: event.timestamp.clone(),
                    reason: err.to_string(),
                });
                (None, event)
            }
        })
        .collect();

    // Stable sort; `None` orders below every `Some`, so unparseable records
    // land at the end in their original order.
    let mut ordered = parsed.clone();
    ordered.sort_by(|a, b| b.0.cmp(&a.0));

    let sorted_events: Vec<FeedingEvent> =
        ordered.iter().map(|(_, event)| (*event).clone()).collect();
    let today_events: Vec<FeedingEvent> = ordered
        .iter()
        .filter(|(ts, _)| ts.is_some_and(|ts| ts.date() == today))
        .map(|(_, event)| (*event).clone())
        .collect();

    let mut daily = RunningMean::default();
    today_events
        .iter()
        .for_each(|event| daily.push(sanitized_grams(event)));
    let daily_average = daily.mean;

    let mut buckets: Vec<WeekBucket> = Vec::new();
    for (ts, event) in &parsed {
        let Some(ts) = ts else { continue };
        let date = ts.date();
        let key = week_key(date);
        let grams = sanitized_grams(event);

        match buckets.iter_mut().find(|bucket| bucket.key == key) {
            Some(bucket) => {
                bucket.grams.push(grams);
                bucket.earliest = bucket.earliest.min(date);
                bucket.latest = bucket.latest.max(date);
            }
            None => {
                let mut running = RunningMean::default();
                running.push(grams);
                buckets.push(WeekBucket {
                    key,
                    grams: running,
                    earliest: date,
                    latest: date,
                });
            }
        }
    }

    let weekly_averages = buckets
        .into_iter()
        .map(|bucket| WeeklyAverage {
            week: bucket.key,
            start_date: format_short_date(bucket.earliest),
            end_date: format_short_date(bucket.latest),
            average: bucket.grams.mean,
            total: bucket.grams.total,
            count: bucket.grams.count,
        })
        .collect();

    AggregationResult {
        sorted_events,
        today_events,
        daily_average,
        weekly_averages,
        rejected,
    }
}

/// Week key in the feeder's own numbering, `YYYY-W<n>`.
///
/// `n = ceil((day_of_year + weekday_of_jan1 + 1) / 7)` with a 0-based day of
/// year and Sunday = 0. Weeks start on Sunday and week 1 is whatever part of
/// the first week falls in January. This is not ISO-8601.
pub fn week_key(date: NaiveDate) -> String {
    let day_of_year = i64::from(date.ordinal0());
    let weekday = i64::from(date.weekday().num_days_from_sunday());
    let weekday_of_jan1 = (weekday - day_of_year).rem_euclid(7);
    let week = (day_of_year + weekday_of_jan1 + 1 + 6) / 7;
    format!("{}-W{}", date.year(), week)
}

fn sanitized_grams(event: &FeedingEvent) -> f64 {
    if event.grams.is_finite() && event.grams >= 0.0 {
        event.grams
    } else {
        warn!(id = %event.id, grams = event.grams, "clamping invalid gram amount to zero");
        0.0
    }
}

/// Mean kept incrementally so it stays finite for any finite, non-negative
/// inputs; the total saturates at `f64::MAX`.
#[derive(Debug, Default)]
struct RunningMean {
    mean: f64,
    total: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        self.total = (self.total + value).min(f64::MAX);
    }
}
