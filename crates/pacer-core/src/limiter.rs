use crate::admission::AdmissionCounters;
use crate::clock::{Clock, MonotonicClock};
use crate::config::RateConfig;
use crate::error::{AdmitError, ConfigError};
use crate::waiter::{compute_wait_time, Sleeper, TokioSleeper};
use crate::window::{Range, WindowTracker};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterSnapshot {
    pub multiplier: u32,
    pub queue_count: u32,
    pub queue_done: u64,
    pub queue_weight: u64,
    pub ranges: Vec<Range>,
}

#[derive(Debug, Clone)]
pub(crate) struct LimiterState {
    counters: AdmissionCounters,
    windows: WindowTracker,
}

impl LimiterState {
    pub(crate) fn new(config: &RateConfig) -> Self {
        Self {
            counters: AdmissionCounters::new(config.max_limit, config.max_weight),
            windows: WindowTracker::new(config.interval_ms),
        }
    }

    pub(crate) fn begin(&mut self, weight: u64, now: u64) -> Result<u64, AdmitError> {
        self.counters.validate_weight(weight)?;

        if self.windows.is_expired(now) {
            debug!(now, "window elapsed with no activity, resetting");
            self.counters.reset();
            self.windows.clear();
        }

        let recorded = self.counters.record_admission(weight);
        if recorded.opens_window() {
            self.windows.open_next(now);
        }

        let Some(range) = self.windows.latest() else {
            return Err(self.abort(AdmitError::NoActiveWindow { now }));
        };

        match compute_wait_time(range, now) {
            Ok(wait) => {
                trace!(weight, now, wait, from = range.from, to = range.to, "admission recorded");
                Ok(wait)
            }
            Err(err) => Err(self.abort(err)),
        }
    }

    // The admission was already counted, so complete it before failing.
    fn abort(&mut self, err: AdmitError) -> AdmitError {
        error!(%err, "window bookkeeping out of order");
        self.finish();
        err
    }

    pub(crate) fn finish(&mut self) {
        if self.counters.record_completion() {
            self.windows.retire_oldest();
        }
    }

    pub(crate) fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot {
            multiplier: self.counters.multiplier,
            queue_count: self.counters.queue_count,
            queue_done: self.counters.queue_done,
            queue_weight: self.counters.queue_weight,
            ranges: self.windows.ranges(),
        }
    }
}

pub struct Limiter {
    config: RateConfig,
    state: Mutex<LimiterState>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl Limiter {
    pub fn new(config: RateConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, Arc::new(MonotonicClock::new()), Arc::new(TokioSleeper))
    }

    pub fn with_parts(
        config: RateConfig,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(LimiterState::new(&config)),
            config,
            clock,
            sleeper,
        })
    }

    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    pub async fn admit(&self) -> Result<Duration, AdmitError> {
        self.admit_weighted(1).await
    }

    /// Dropping the returned future while it waits still counts the
    /// admission as completed.
    pub async fn admit_weighted(&self, weight: u64) -> Result<Duration, AdmitError> {
        let wait_ms = {
            let mut state = self.state.lock();
            let now = self.clock.now_ms();
            state.begin(weight, now)?
        };

        let pending = Pending {
            state: &self.state,
            armed: true,
        };
        let wait = Duration::from_millis(wait_ms);
        if !wait.is_zero() {
            debug!(wait_ms, weight, "admission delayed");
        }
        // Zero waits still yield: a burst is fully admitted before any completes.
        self.sleeper.sleep(wait).await;
        pending.complete();
        Ok(wait)
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        self.state.lock().snapshot()
    }
}

struct Pending<'a> {
    state: &'a Mutex<LimiterState>,
    armed: bool,
}

impl Pending<'_> {
    fn complete(mut self) {
        self.armed = false;
        self.state.lock().finish();
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("admission dropped while waiting, recording completion");
            self.state.lock().finish();
        }
    }
}
