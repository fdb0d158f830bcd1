use crate::error::AdmitError;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Joined { first: bool },
    /// Current batch was full; this admission seeds the next one.
    Overflowed,
}

impl Recorded {
    pub fn opens_window(self) -> bool {
        matches!(self, Recorded::Joined { first: true } | Recorded::Overflowed)
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionCounters {
    max_limit: u32,
    max_weight: Option<u64>,
    pub(crate) multiplier: u32,
    pub(crate) queue_count: u32,
    pub(crate) queue_done: u64,
    pub(crate) queue_weight: u64,
}

impl AdmissionCounters {
    pub fn new(max_limit: u32, max_weight: Option<u64>) -> Self {
        Self {
            max_limit,
            max_weight,
            multiplier: 0,
            queue_count: 0,
            queue_done: 0,
            queue_weight: 0,
        }
    }

    pub fn validate_weight(&self, weight: u64) -> Result<(), AdmitError> {
        match self.max_weight {
            Some(max_weight) if weight > max_weight => {
                Err(AdmitError::WeightTooLarge { weight, max_weight })
            }
            _ => Ok(()),
        }
    }

    pub fn reset(&mut self) {
        self.multiplier = 0;
        self.queue_count = 0;
        self.queue_done = 0;
        self.queue_weight = 0;
    }

    pub fn record_admission(&mut self, weight: u64) -> Recorded {
        self.queue_count = self.queue_count.saturating_add(1);
        if self.max_weight.is_some() {
            self.queue_weight = self.queue_weight.saturating_add(weight);
        }
        if self.is_over_max() {
            self.multiplier += 1;
            self.queue_count = 1;
            if self.max_weight.is_some() {
                self.queue_weight = weight;
            }
            debug!(multiplier = self.multiplier, "batch overflowed into next window");
            return Recorded::Overflowed;
        }
        Recorded::Joined {
            first: self.queue_count == 1,
        }
    }

    /// Returns true when a batch has drained and its window can be retired.
    pub fn record_completion(&mut self) -> bool {
        self.queue_done += 1;
        if self.queue_done < u64::from(self.max_limit) {
            return false;
        }
        self.multiplier = self.multiplier.saturating_sub(1);
        if self.multiplier > 0 {
            self.queue_count = self.max_limit;
            if let Some(max_weight) = self.max_weight {
                self.queue_weight = max_weight;
            }
        }
        debug!(
            multiplier = self.multiplier,
            done = self.queue_done,
            "batch drained"
        );
        true
    }

    fn is_over_max(&self) -> bool {
        let over_limit = self.queue_count > self.max_limit;
        let over_weight = self
            .max_weight
            .map(|max| self.queue_weight > max)
            .unwrap_or(false);
        over_limit || over_weight
    }
}
