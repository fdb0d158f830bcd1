use crate::error::AdmitError;
use crate::window::Range;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(duration).await;
        }
    }
}

pub fn compute_wait_time(range: Range, now: u64) -> Result<u64, AdmitError> {
    if range.contains(now) {
        return Ok(0);
    }
    if range.from > now {
        return Ok(range.from - now);
    }
    let wait = i64::try_from(range.from)
        .unwrap_or(i64::MAX)
        .saturating_sub(i64::try_from(now).unwrap_or(i64::MAX));
    Err(AdmitError::NegativeWait {
        from: range.from,
        to: range.to,
        now,
        wait,
    })
}
