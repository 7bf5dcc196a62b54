//! Embassy-backed implementations of the monitor collaborators.

pub mod analog;

use embassy_time::{Duration, Timer};
use monitor_core::monitor::Pacer;

pub use analog::AnalogChannel;

pub(crate) fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = duration.as_micros();
    let micros = u64::try_from(micros).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

/// Pacer that suspends the task on the Embassy timer.
#[derive(Copy, Clone, Debug, Default)]
pub struct TimerPacer;

impl Pacer for TimerPacer {
    async fn pause(&mut self, duration: core::time::Duration) {
        Timer::after(core_duration_to_embassy(duration)).await;
    }
}
