//! Simulated peripherals backing the emulator sessions.

use std::io::{self, IsTerminal};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use monitor_core::board::{AnalogInput, BoardProfile, BusPins, PinAssignment};
use monitor_core::charger::{DEFAULT_ADDRESS, REGISTER_COUNT, REGISTER_RESET_BIT, Register};
use monitor_core::monitor::{IterationLimit, Pacer, StatusIndicator, StopSignal};
use monitor_core::sampler::SampleSource;

/// Board exposed by the emulator. Every peripheral is simulated.
pub const SIMULATED_BOARD: BoardProfile = BoardProfile {
    name: "host-simulator",
    status_led: Some(PinAssignment::new("SIM-LED", "status")),
    analog_input: Some(AnalogInput {
        pin: PinAssignment::new("SIM-A0", "A0"),
        channel: 0,
    }),
    charger_bus: Some(BusPins {
        sda: PinAssignment::new("SIM-SDA", "SDA"),
        scl: PinAssignment::new("SIM-SCL", "SCL"),
    }),
};

/// Injected converter failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConversionTimeout {
    /// One-based index of the failing conversion.
    pub conversion: u32,
}

/// Analog input that hovers around a fixed level with bounded uniform noise.
pub struct NoisySource {
    level: u16,
    noise: u16,
    max_raw: u16,
    state: u32,
    conversions: u32,
    fault_every: Option<u32>,
}

impl NoisySource {
    const SEED: u32 = 0x2545_f491;

    pub fn new(level: u16, noise: u16, max_raw: u16) -> Self {
        Self {
            level: level.min(max_raw),
            noise,
            max_raw,
            state: Self::SEED,
            conversions: 0,
            fault_every: None,
        }
    }

    /// Fails every `n`th conversion.
    #[must_use]
    pub fn with_fault_every(mut self, fault_every: Option<u32>) -> Self {
        self.fault_every = fault_every.filter(|n| *n > 0);
        self
    }

    pub fn conversions(&self) -> u32 {
        self.conversions
    }

    fn next_offset(&mut self) -> i32 {
        if self.noise == 0 {
            return 0;
        }
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let span = u32::from(self.noise) * 2 + 1;
        let offset = (self.state >> 16) % span;
        // span is at most 2 * u16::MAX + 1, so both fit in i32.
        #[allow(clippy::cast_possible_wrap)]
        let offset = offset as i32;
        offset - i32::from(self.noise)
    }
}

impl SampleSource for NoisySource {
    type Error = ConversionTimeout;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        self.conversions = self.conversions.wrapping_add(1);
        let conversions = self.conversions;
        if self.fault_every.is_some_and(|n| conversions % n == 0) {
            return Err(ConversionTimeout {
                conversion: self.conversions,
            });
        }

        let sample = (i32::from(self.level) + self.next_offset()).clamp(0, i32::from(self.max_raw));
        Ok(u16::try_from(sample).unwrap_or(self.max_raw))
    }
}

/// Power-on register values of the simulated charger.
pub const CHARGER_DEFAULTS: [u8; REGISTER_COUNT] = [
    0x17, 0x1A, 0xA2, 0x22, 0x58, 0x9F, 0xE6, 0x4C, 0x0C, 0x00, 0x00, 0x27,
];

/// Transaction failure injected by [`SimulatedCharger`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SimulatedBusError(ErrorKind);

impl i2c::Error for SimulatedBusError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// SGM41511 register file behind an auto-incrementing register pointer.
pub struct SimulatedCharger {
    address: u8,
    registers: [u8; REGISTER_COUNT],
    pointer: usize,
    transactions: u32,
    fault_every: Option<u32>,
}

impl SimulatedCharger {
    pub fn new() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            registers: CHARGER_DEFAULTS,
            pointer: 0,
            transactions: 0,
            fault_every: None,
        }
    }

    /// Drops the address acknowledge on every `n`th transaction.
    #[must_use]
    pub fn with_fault_every(mut self, fault_every: Option<u32>) -> Self {
        self.fault_every = fault_every.filter(|n| *n > 0);
        self
    }

    pub fn register(&self, register: Register) -> u8 {
        self.registers[usize::from(register.index())]
    }

    pub fn set_register(&mut self, register: Register, value: u8) {
        self.registers[usize::from(register.index())] = value;
    }

    fn store(&mut self, value: u8) -> Result<(), SimulatedBusError> {
        let slot = self
            .registers
            .get_mut(self.pointer)
            .ok_or(SimulatedBusError(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Data,
            )))?;
        *slot = value;

        if self.pointer == usize::from(Register::Reg0B.index()) && value & REGISTER_RESET_BIT != 0
        {
            self.registers = CHARGER_DEFAULTS;
        }
        self.pointer += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<u8, SimulatedBusError> {
        let value = *self
            .registers
            .get(self.pointer)
            .ok_or(SimulatedBusError(ErrorKind::Bus))?;
        self.pointer += 1;
        Ok(value)
    }
}

impl Default for SimulatedCharger {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for SimulatedCharger {
    type Error = SimulatedBusError;
}

impl I2c for SimulatedCharger {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions = self.transactions.wrapping_add(1);
        let transactions = self.transactions;
        let injected = self.fault_every.is_some_and(|n| transactions % n == 0);
        if address != self.address || injected {
            return Err(SimulatedBusError(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address,
            )));
        }

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((&index, data)) = bytes.split_first() {
                        self.pointer = usize::from(index);
                        for &value in data {
                            self.store(value)?;
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for slot in buffer.iter_mut() {
                        *slot = self.load()?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Pacer that sleeps the thread, or skips waits entirely in fast mode.
#[derive(Copy, Clone, Debug)]
pub struct HostPacer {
    fast: bool,
}

impl HostPacer {
    pub fn new(fast: bool) -> Self {
        Self { fast }
    }
}

impl Pacer for HostPacer {
    async fn pause(&mut self, duration: Duration) {
        if !self.fast {
            thread::sleep(duration);
        }
    }
}

/// Status LED that counts pulses instead of lighting anything.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimulatedLed {
    lit: bool,
    pulses: u32,
}

impl SimulatedLed {
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

impl StatusIndicator for SimulatedLed {
    fn set_lit(&mut self, lit: bool) {
        if lit && !self.lit {
            self.pulses += 1;
        }
        self.lit = lit;
    }
}

/// Raw-mode terminal guard that reports `q`, Esc or Ctrl-C key presses.
pub struct KeyStop {
    _raw: RawModeGuard,
}

impl KeyStop {
    /// Enables raw mode when stdin is a terminal; returns `None` otherwise.
    pub fn attach() -> io::Result<Option<Self>> {
        if !io::stdin().is_terminal() {
            return Ok(None);
        }
        terminal::enable_raw_mode()?;
        Ok(Some(Self {
            _raw: RawModeGuard,
        }))
    }

    fn stop_requested() -> bool {
        while let Ok(true) = event::poll(Duration::ZERO) {
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let ctrl_c =
                key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                return true;
            }
        }
        false
    }
}

struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Stops on an iteration budget, a key press, or whichever comes first.
#[derive(Default)]
pub struct SessionStop {
    limit: Option<IterationLimit>,
    keys: Option<KeyStop>,
}

impl SessionStop {
    pub fn new(iterations: Option<u32>, keys: Option<KeyStop>) -> Self {
        Self {
            limit: iterations.map(IterationLimit::new),
            keys,
        }
    }

    pub fn raw_mode(&self) -> bool {
        self.keys.is_some()
    }
}

impl StopSignal for SessionStop {
    fn should_stop(&mut self) -> bool {
        if self.keys.is_some() && KeyStop::stop_requested() {
            return true;
        }
        self.limit.as_mut().is_some_and(StopSignal::should_stop)
    }
}
