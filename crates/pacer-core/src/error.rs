use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmitError {
    #[error("weight {weight} exceeds max weight {max_weight}")]
    WeightTooLarge { weight: u64, max_weight: u64 },

    #[error("wait time {wait}ms is invalid (range {from}..={to}, now {now})")]
    NegativeWait { from: u64, to: u64, now: u64, wait: i64 },

    #[error("no active window after admission at {now}")]
    NoActiveWindow { now: u64 },
}

impl AdmitError {
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            AdmitError::NegativeWait { .. } | AdmitError::NoActiveWindow { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid limiter config: {0}")]
    Invalid(String),
}
