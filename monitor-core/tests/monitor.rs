use core::cell::RefCell;
use core::convert::Infallible;
use core::time::Duration;

use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType, OutputPin};
use heapless::Vec;

use monitor_core::monitor::{
    Cadence, IterationLimit, Monitor, NoPause, Pacer, PinIndicator, Probe, RunSummary,
    StatusIndicator, StopSignal,
};
use monitor_core::sampler::{AveragingSampler, ConstantSource};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Event {
    Lit(bool),
    Pause(Duration),
}

type Journal = RefCell<Vec<Event, 64>>;

struct RecordingLed<'a>(&'a Journal);

impl StatusIndicator for RecordingLed<'_> {
    fn set_lit(&mut self, lit: bool) {
        self.0.borrow_mut().push(Event::Lit(lit)).unwrap();
    }
}

struct RecordingPacer<'a>(&'a Journal);

impl Pacer for RecordingPacer<'_> {
    async fn pause(&mut self, duration: Duration) {
        self.0.borrow_mut().push(Event::Pause(duration)).unwrap();
    }
}

/// Counts up from zero; fails on every multiple of `fail_every`.
struct Counter {
    next: u32,
    fail_every: u32,
}

impl Probe for Counter {
    type Output = u32;
    type Error = &'static str;

    fn acquire(&mut self) -> Result<Self::Output, Self::Error> {
        let value = self.next;
        self.next += 1;
        if self.fail_every != 0 && value % self.fail_every == 0 {
            Err("fault")
        } else {
            Ok(value)
        }
    }
}

struct StopAfterFlag<'a> {
    flag: &'a RefCell<bool>,
}

impl StopSignal for StopAfterFlag<'_> {
    fn should_stop(&mut self) -> bool {
        *self.flag.borrow()
    }
}

#[derive(Default)]
struct MockPin {
    high: bool,
    writes: u32,
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}

#[test]
fn bounded_run_reports_every_iteration() {
    let sampler = AveragingSampler::new(ConstantSource(409));
    let mut monitor = Monitor::new(sampler, Cadence::STEADY);
    let mut raws: Vec<u16, 8> = Vec::new();

    let summary = block_on(monitor.run(&mut NoPause, IterationLimit::new(3), |outcome| {
        raws.push(outcome.unwrap().raw).unwrap();
    }));

    assert_eq!(
        summary,
        RunSummary {
            iterations: 3,
            faults: 0
        }
    );
    assert_eq!(raws.as_slice(), &[409, 409, 409]);
}

#[test]
fn zero_iterations_never_touch_the_probe() {
    let mut monitor = Monitor::new(
        Counter {
            next: 0,
            fail_every: 0,
        },
        Cadence::STEADY,
    );

    let summary = block_on(monitor.run(&mut NoPause, IterationLimit::new(0), |_| {
        panic!("no iteration expected");
    }));

    assert_eq!(summary.iterations, 0);
    assert_eq!(monitor.probe().next, 0);
}

#[test]
fn heartbeat_pulses_then_rests() {
    let journal = Journal::new(Vec::new());
    let mut pacer = RecordingPacer(&journal);
    let mut monitor = Monitor::with_indicator(
        Counter {
            next: 1,
            fail_every: 0,
        },
        RecordingLed(&journal),
        Cadence::HEARTBEAT,
    );

    block_on(monitor.run(&mut pacer, IterationLimit::new(2), |_| {}));

    let pulse = Event::Pause(Duration::from_millis(250));
    let rest = Event::Pause(Duration::from_millis(1_750));
    assert_eq!(
        journal.borrow().as_slice(),
        &[
            Event::Lit(false),
            Event::Lit(true),
            pulse,
            Event::Lit(false),
            rest,
            Event::Lit(true),
            pulse,
            Event::Lit(false),
            rest,
        ]
    );
}

#[test]
fn steady_cadence_only_sleeps() {
    let journal = Journal::new(Vec::new());
    let mut pacer = RecordingPacer(&journal);
    let mut monitor = Monitor::with_indicator(
        Counter {
            next: 1,
            fail_every: 0,
        },
        RecordingLed(&journal),
        Cadence::STEADY,
    );

    block_on(monitor.run(&mut pacer, IterationLimit::new(2), |_| {}));

    let sleep = Event::Pause(Duration::from_millis(2_000));
    assert_eq!(
        journal.borrow().as_slice(),
        &[Event::Lit(false), sleep, sleep]
    );
}

#[test]
fn missing_led_keeps_the_period() {
    let journal = Journal::new(Vec::new());
    let mut pacer = RecordingPacer(&journal);
    let mut monitor = Monitor::new(
        Counter {
            next: 1,
            fail_every: 0,
        },
        Cadence::RAPID,
    );

    block_on(monitor.run(&mut pacer, IterationLimit::new(1), |_| {}));

    let total: Duration = journal
        .borrow()
        .iter()
        .map(|event| match event {
            Event::Pause(duration) => *duration,
            Event::Lit(_) => Duration::ZERO,
        })
        .sum();
    assert_eq!(total, Cadence::RAPID.period());
}

#[test]
fn faults_are_reported_and_the_loop_continues() {
    let mut monitor = Monitor::new(
        Counter {
            next: 0,
            fail_every: 2,
        },
        Cadence::STEADY,
    );
    let mut seen: Vec<Result<u32, &'static str>, 8> = Vec::new();

    let summary = block_on(monitor.run(&mut NoPause, IterationLimit::new(5), |outcome| {
        seen.push(outcome.copied().map_err(|err| *err)).unwrap();
    }));

    assert_eq!(
        summary,
        RunSummary {
            iterations: 5,
            faults: 3
        }
    );
    assert_eq!(
        seen.as_slice(),
        &[Err("fault"), Ok(1), Err("fault"), Ok(3), Err("fault")]
    );
}

#[test]
fn external_stop_signal_ends_the_loop() {
    let flag = RefCell::new(false);
    let mut monitor = Monitor::new(
        Counter {
            next: 0,
            fail_every: 0,
        },
        Cadence::STEADY,
    );

    let summary = block_on(monitor.run(
        &mut NoPause,
        StopAfterFlag { flag: &flag },
        |outcome| {
            if outcome == Ok(&4) {
                *flag.borrow_mut() = true;
            }
        },
    ));

    assert_eq!(summary.iterations, 5);
}

#[test]
fn pin_indicator_drives_the_pin() {
    let mut indicator = PinIndicator::new(MockPin::default());

    indicator.set_lit(true);
    indicator.set_lit(false);
    indicator.set_lit(true);

    let pin = indicator.into_inner();
    assert!(pin.high);
    assert_eq!(pin.writes, 3);
}

#[test]
fn step_acquires_once() {
    let mut monitor = Monitor::new(AveragingSampler::new(ConstantSource(2048)), Cadence::STEADY);
    let reading = monitor.step().unwrap();

    assert_eq!(reading.raw, 2048);
    assert_eq!(monitor.cadence(), Cadence::STEADY);
}
