//! Run loop shared by every monitoring application.
//!
//! A [`Monitor`] repeatedly acquires a value from a [`Probe`], hands the outcome
//! to a reporting callback, pulses a [`StatusIndicator`], and then waits out the
//! rest of its [`Cadence`] on a [`Pacer`]. On target the loop runs until reset;
//! the [`StopSignal`] seam lets host code bound it instead.

use core::time::Duration;

use embedded_hal::digital::OutputPin;

/// Source of one monitored value per loop iteration.
pub trait Probe {
    /// Value reported on success.
    type Output;
    /// Failure reported instead of a value.
    type Error;

    /// Performs one blocking acquisition.
    fn acquire(&mut self) -> Result<Self::Output, Self::Error>;
}

/// Delay collaborator used between iterations.
#[allow(async_fn_in_trait)]
pub trait Pacer {
    /// Suspends the calling task for `duration`.
    async fn pause(&mut self, duration: Duration);
}

/// Pacer that returns immediately.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoPause;

impl Pacer for NoPause {
    async fn pause(&mut self, _: Duration) {}
}

/// Decides when a run loop ends.
pub trait StopSignal {
    /// Checked before every iteration; `true` ends the loop.
    fn should_stop(&mut self) -> bool;
}

/// Stop signal that never fires.
#[derive(Copy, Clone, Debug, Default)]
pub struct RunForever;

impl StopSignal for RunForever {
    fn should_stop(&mut self) -> bool {
        false
    }
}

/// Stop signal that allows a fixed number of iterations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IterationLimit {
    remaining: u32,
}

impl IterationLimit {
    #[must_use]
    pub const fn new(iterations: u32) -> Self {
        Self {
            remaining: iterations,
        }
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl StopSignal for IterationLimit {
    fn should_stop(&mut self) -> bool {
        if self.remaining == 0 {
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

impl<S: StopSignal + ?Sized> StopSignal for &mut S {
    fn should_stop(&mut self) -> bool {
        (**self).should_stop()
    }
}

/// Status LED collaborator.
pub trait StatusIndicator {
    /// Drives the indicator on (`true`) or off (`false`).
    fn set_lit(&mut self, lit: bool);
}

/// Indicator for boards without a status LED.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIndicator;

impl NoIndicator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl StatusIndicator for NoIndicator {
    fn set_lit(&mut self, _: bool) {}
}

impl<L: StatusIndicator> StatusIndicator for Option<L> {
    fn set_lit(&mut self, lit: bool) {
        if let Some(indicator) = self {
            indicator.set_lit(lit);
        }
    }
}

/// Drives a push-pull output pin as the status LED (active high).
pub struct PinIndicator<P> {
    pin: P,
}

impl<P: OutputPin> PinIndicator<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> StatusIndicator for PinIndicator<P> {
    fn set_lit(&mut self, lit: bool) {
        // A failed LED write only costs the blink.
        let _ = if lit {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }
}

/// Loop timing: an optional LED pulse followed by a rest period.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cadence {
    /// LED on-time at the start of the wait, if the LED is pulsed at all.
    pub pulse: Option<Duration>,
    /// Time spent with the LED off before the next iteration.
    pub rest: Duration,
}

impl Cadence {
    /// 250 ms flash every two seconds.
    pub const HEARTBEAT: Self = Self::pulsed(Duration::from_millis(250), Duration::from_millis(1_750));
    /// Plain two second sleep with no LED activity.
    pub const STEADY: Self = Self::unpulsed(Duration::from_millis(2_000));
    /// 50 ms on / 50 ms off, used while polling the charger.
    pub const RAPID: Self = Self::pulsed(Duration::from_millis(50), Duration::from_millis(50));

    #[must_use]
    pub const fn pulsed(pulse: Duration, rest: Duration) -> Self {
        Self {
            pulse: Some(pulse),
            rest,
        }
    }

    #[must_use]
    pub const fn unpulsed(rest: Duration) -> Self {
        Self { pulse: None, rest }
    }

    /// Total wait between two acquisitions.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.pulse.unwrap_or(Duration::ZERO) + self.rest
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::HEARTBEAT
    }
}

/// Borrowed outcome of one acquisition handed to the report callback.
pub type Outcome<'a, T, E> = Result<&'a T, &'a E>;

/// Counters returned when a run loop stops.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// Completed iterations, failed or not.
    pub iterations: u32,
    /// Iterations whose acquisition failed.
    pub faults: u32,
}

/// Binds a probe, an indicator and a cadence into a run loop.
pub struct Monitor<P, L = NoIndicator> {
    probe: P,
    indicator: L,
    cadence: Cadence,
}

impl<P: Probe> Monitor<P> {
    /// Creates a monitor without a status LED.
    pub fn new(probe: P, cadence: Cadence) -> Self {
        Self::with_indicator(probe, NoIndicator::new(), cadence)
    }
}

impl<P: Probe, L: StatusIndicator> Monitor<P, L> {
    /// Creates a monitor that pulses `indicator` once per iteration.
    pub fn with_indicator(probe: P, mut indicator: L, cadence: Cadence) -> Self {
        indicator.set_lit(false);
        Self {
            probe,
            indicator,
            cadence,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    pub fn indicator(&self) -> &L {
        &self.indicator
    }

    /// Runs a single acquisition without reporting or waiting.
    ///
    /// # Errors
    ///
    /// Propagates the probe's error.
    pub fn step(&mut self) -> Result<P::Output, P::Error> {
        self.probe.acquire()
    }

    /// Runs iterations until `stop` fires.
    ///
    /// Each iteration acquires, reports, then pulses the indicator and waits out
    /// the cadence. Probe errors are reported and counted; they never end the
    /// loop.
    pub async fn run<T, S, F>(&mut self, pacer: &mut T, mut stop: S, mut report: F) -> RunSummary
    where
        T: Pacer,
        S: StopSignal,
        F: FnMut(Outcome<'_, P::Output, P::Error>),
    {
        let mut summary = RunSummary::default();

        while !stop.should_stop() {
            match self.probe.acquire() {
                Ok(output) => report(Ok(&output)),
                Err(error) => {
                    summary.faults = summary.faults.saturating_add(1);
                    report(Err(&error));
                }
            }
            summary.iterations = summary.iterations.saturating_add(1);

            self.wait_out_cadence(pacer).await;
        }

        summary
    }

    async fn wait_out_cadence<T: Pacer>(&mut self, pacer: &mut T) {
        if let Some(pulse) = self.cadence.pulse {
            self.indicator.set_lit(true);
            pacer.pause(pulse).await;
            self.indicator.set_lit(false);
        }
        pacer.pause(self.cadence.rest).await;
    }
}
