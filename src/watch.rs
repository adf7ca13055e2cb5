//! Reacting to the remote refresh flag.
//!
//! The flag is polled; [`FlagWatcher`] turns the stream of observations into
//! change notifications so the reaction runs once per distinct value no
//! matter how often the same value is seen.

use std::future::Future;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, warn};

pub const REFRESH_FLAG: &str = "refreshAnalytics";

#[derive(Debug)]
pub struct FlagWatcher<T> {
    last: Option<T>,
}

impl<T: PartialEq> Default for FlagWatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> FlagWatcher<T> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Returns `true` when `value` differs from the previous observation.
    /// The first observation always counts as a change.
    pub fn observe(&mut self, value: T) -> bool {
        if self.last.as_ref() == Some(&value) {
            return false;
        }
        self.last = Some(value);
        true
    }
}

/// Polls `read_flag` every `period` and awaits `react` on each change.
///
/// Errors from either side are logged and the loop keeps going; a failed
/// reaction is retried on the next tick. With `stop_when_absent` a missing
/// flag ends the loop, otherwise it is observed as an empty value.
pub async fn watch_flag<R, RF, A, AF>(
    period: Duration,
    stop_when_absent: bool,
    mut read_flag: R,
    mut react: A,
) where
    R: FnMut() -> RF,
    RF: Future<Output = anyhow::Result<Option<String>>>,
    A: FnMut(String) -> AF,
    AF: Future<Output = anyhow::Result<()>>,
{
    let mut watcher = FlagWatcher::new();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let value = match read_flag().await {
            Ok(Some(value)) => value,
            Ok(None) if stop_when_absent => return,
            Ok(None) => String::new(),
            Err(err) => {
                warn!(error = %err, "failed to read refresh flag");
                continue;
            }
        };

        if !watcher.observe(value.clone()) {
            debug!(flag = REFRESH_FLAG, "refresh flag unchanged");
            continue;
        }

        if let Err(err) = react(value).await {
            warn!(error = %err, "refresh reaction failed");
            watcher.last = None;
        }
    }
}
