//! Publishing the computed daily average.
//!
//! The local view is updated first so the caller can show the new number
//! immediately; the write to the shared store happens afterwards and is
//! retried on its own. A failed write never rolls the view back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::models::AggregationResult;

/// Destination for the informational daily-average cache.
#[async_trait]
pub trait AverageStore: Send + Sync {
    async fn write_daily_average(
        &self,
        day: NaiveDate,
        average: f64,
        event_count: usize,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

/// What the operator currently sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub day: Option<NaiveDate>,
    pub daily_average: f64,
    pub feedings_today: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishDailyAverage {
    pub day: NaiveDate,
    pub average: f64,
    pub event_count: usize,
}

impl PublishDailyAverage {
    pub fn from_result(day: NaiveDate, result: &AggregationResult) -> Self {
        Self {
            day,
            average: result.daily_average,
            event_count: result.today_events.len(),
        }
    }

    pub fn apply_local(&self, view: &mut DashboardView) -> Result<(), SyncError> {
        if !self.average.is_finite() || self.average < 0.0 {
            return Err(SyncError::Local(format!(
                "daily average {} for {} is not a valid amount",
                self.average, self.day
            )));
        }

        view.day = Some(self.day);
        view.daily_average = self.average;
        view.feedings_today = self.event_count;
        Ok(())
    }

    /// Returns the number of attempts the write took.
    pub async fn persist(
        &self,
        store: &dyn AverageStore,
        policy: RetryPolicy,
    ) -> Result<u32, SyncError> {
        let max_attempts = policy.max_attempts.max(1);
        let mut backoff = policy.initial_backoff;
        let mut attempt = 1;

        loop {
            match store
                .write_daily_average(self.day, self.average, self.event_count)
                .await
            {
                Ok(()) => {
                    info!(day = %self.day, average = self.average, attempt, "daily average persisted");
                    return Ok(attempt);
                }
                Err(err) if attempt < max_attempts => {
                    warn!(day = %self.day, attempt, error = %err, "daily average write failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(SyncError::Persist {
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }

    pub async fn execute(
        &self,
        view: &mut DashboardView,
        store: &dyn AverageStore,
        policy: RetryPolicy,
    ) -> Result<u32, SyncError> {
        self.apply_local(view)?;
        self.persist(store, policy).await
    }
}
