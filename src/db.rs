use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::FeedingEvent;
use crate::sync::AverageStore;
use crate::timestamp::FeedTimestamp;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Loads two weeks of realistic history ending at `now`: a breakfast and a
/// dinner schedule plus the odd manual top-up.
pub async fn seed(pool: &PgPool, now: NaiveDateTime) -> anyhow::Result<usize> {
    let today = now.date();
    let mut events = Vec::new();

    for days_ago in 0..14i64 {
        let day = today - Duration::days(days_ago);
        for (hour, grams) in [(7, 30.0), (18, 35.0)] {
            let at = day
                .and_hms_opt(hour, 0, 0)
                .context("invalid seed time")?;
            if at > now {
                continue;
            }
            events.push(FeedingEvent {
                id: format!("seed-{}-{hour:02}", day.format("%Y%m%d")),
                timestamp: FeedTimestamp::from_naive(at).to_string(),
                grams,
            });
        }
        if days_ago % 3 == 1 {
            let at = day.and_hms_opt(12, 30, 0).context("invalid seed time")?;
            events.push(FeedingEvent {
                id: format!("seed-{}-manual", day.format("%Y%m%d")),
                timestamp: FeedTimestamp::from_naive(at).to_string(),
                grams: 10.0,
            });
        }
    }

    import_events(pool, &events).await
}

/// Upserts events by id. Returns how many were new.
pub async fn import_events(pool: &PgPool, events: &[FeedingEvent]) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for event in events {
        let id = if event.id.is_empty() {
            format!("import-{}", Uuid::new_v4())
        } else {
            event.id.clone()
        };

        let inserted_row: bool = sqlx::query(
            r#"
            INSERT INTO pet_feeder.feeding_events (id, recorded_at, grams)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET recorded_at = EXCLUDED.recorded_at, grams = EXCLUDED.grams
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&id)
        .bind(&event.timestamp)
        .bind(event.grams)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to store feeding event {id}"))?
        .get("inserted");

        if inserted_row {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn fetch_events(pool: &PgPool) -> anyhow::Result<Vec<FeedingEvent>> {
    let rows = sqlx::query(
        "SELECT id, recorded_at, grams FROM pet_feeder.feeding_events ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| FeedingEvent {
            id: row.get("id"),
            timestamp: row.get("recorded_at"),
            grams: row.get("grams"),
        })
        .collect())
}

pub async fn read_command(pool: &PgPool, name: &str) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM pet_feeder.commands WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("value")))
}

pub async fn set_command(pool: &PgPool, name: &str, value: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pet_feeder.commands (name, value, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (name) DO UPDATE
        SET value = EXCLUDED.value, updated_at = now()
        "#,
    )
    .bind(name)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Postgres-backed daily average cache. Last writer wins per day.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AverageStore for PgStore {
    async fn write_daily_average(
        &self,
        day: NaiveDate,
        average: f64,
        event_count: usize,
    ) -> anyhow::Result<()> {
        let event_count = i32::try_from(event_count).context("event count out of range")?;
        sqlx::query(
            r#"
            INSERT INTO pet_feeder.daily_averages (day, average_grams, event_count, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (day) DO UPDATE
            SET average_grams = EXCLUDED.average_grams,
                event_count = EXCLUDED.event_count,
                updated_at = now()
            "#,
        )
        .bind(day)
        .bind(average)
        .bind(event_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
