//! Timer service: clock sources and the run-tagged action queue used for every
//! simulated processing delay.

pub mod clock;
pub mod queue;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use queue::{RunId, Schedule, ScheduledAction, TimerQueue};
