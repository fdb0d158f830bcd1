pub mod admission;
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod waiter;
pub mod window;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{LimitsFile, RateConfig};
pub use error::{AdmitError, ConfigError};
pub use limiter::{Limiter, LimiterSnapshot};
pub use waiter::{Sleeper, TokioSleeper};
pub use window::Range;
