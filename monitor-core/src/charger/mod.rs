//! SGM41511 battery-charger register access over a two-wire bus.
//!
//! The charger exposes twelve byte-wide registers (`REG00`..`REG0B`) behind a
//! fixed 7-bit address. A read sets the register pointer with a one-byte write
//! and then reads in a separate transaction; the device auto-increments the
//! pointer, so bursts only need the first index.

use core::fmt;
use core::time::Duration;

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::monitor::Probe;

pub mod registers;

pub use registers::{ChargeStatus, DeviceInfo, REGISTER_COUNT, Register, RegisterSnapshot};

/// Factory 7-bit bus address.
pub const DEFAULT_ADDRESS: u8 = 0x6B;

/// Standard-mode bus clock used for the charger.
pub const DEFAULT_BUS_FREQUENCY_HZ: u32 = 100_000;

/// Writing this bit to REG0B restores every register to its default.
pub const REGISTER_RESET_BIT: u8 = 0x80;

/// Failure reported by a charger transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusError {
    /// The addressed device (or a data byte) was not acknowledged.
    NoAcknowledge { address: u8 },
    /// Another controller won arbitration.
    ArbitrationLoss,
    /// Misplaced START/STOP or other bus-level error.
    Bus,
    /// Controller could not keep up with the data rate.
    Overrun,
    /// Request would read or write past `REG0B`.
    RegisterRange { start: u8, len: usize },
    /// Driver-specific failure.
    Other,
}

impl BusError {
    fn from_kind(kind: ErrorKind, address: u8) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => BusError::NoAcknowledge { address },
            ErrorKind::ArbitrationLoss => BusError::ArbitrationLoss,
            ErrorKind::Bus => BusError::Bus,
            ErrorKind::Overrun => BusError::Overrun,
            _ => BusError::Other,
        }
    }

    /// Returns `true` when the error came from a missing acknowledge.
    #[must_use]
    pub const fn is_nack(&self) -> bool {
        matches!(self, BusError::NoAcknowledge { .. })
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::NoAcknowledge { address } => {
                write!(f, "no acknowledge from device 0x{address:02x}")
            }
            BusError::ArbitrationLoss => f.write_str("bus arbitration lost"),
            BusError::Bus => f.write_str("bus error"),
            BusError::Overrun => f.write_str("bus overrun"),
            BusError::RegisterRange { start, len } => {
                write!(f, "{len} byte(s) from 0x{start:02x} exceed the register map")
            }
            BusError::Other => f.write_str("bus transaction failed"),
        }
    }
}

/// Startup and polling options for the charger probe.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChargerConfig {
    pub address: u8,
    pub bus_frequency_hz: u32,
    /// Wait after bus initialisation before the first transaction.
    pub settle: Duration,
    /// Register polled on every iteration.
    pub status_register: Register,
    /// Issue a register reset before polling starts.
    pub reset_on_start: bool,
}

impl ChargerConfig {
    pub const DEFAULT: Self = Self {
        address: DEFAULT_ADDRESS,
        bus_frequency_hz: DEFAULT_BUS_FREQUENCY_HZ,
        settle: Duration::from_millis(10),
        status_register: Register::Reg0B,
        reset_on_start: false,
    };
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Handle for one SGM41511 on a two-wire bus.
pub struct Sgm41511<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Sgm41511<I> {
    /// Creates a handle at the factory address.
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    /// Creates a handle at a custom address.
    pub fn with_address(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn bus(&self) -> &I {
        &self.i2c
    }

    pub fn bus_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    pub fn release(self) -> I {
        self.i2c
    }

    /// Restores every register to its power-on default.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] reported by the write.
    pub fn reset(&mut self) -> Result<(), BusError> {
        self.write_register(Register::Reg0B, REGISTER_RESET_BIT)
    }

    /// Writes one register.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] reported by the write.
    pub fn write_register(&mut self, register: Register, value: u8) -> Result<(), BusError> {
        let address = self.address;
        self.i2c
            .write(address, &[register.index(), value])
            .map_err(|err| BusError::from_kind(err.kind(), address))
    }

    /// Reads one register.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] from either the pointer write or the read.
    pub fn read_register(&mut self, register: Register) -> Result<u8, BusError> {
        let mut buffer = [0u8; 1];
        self.read_registers(register, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Reads `buffer.len()` consecutive registers starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::RegisterRange`] without touching the bus when the
    /// burst would run past `REG0B`; otherwise the first failing transaction's
    /// error. The buffer contents are unspecified after an error.
    pub fn read_registers(&mut self, start: Register, buffer: &mut [u8]) -> Result<(), BusError> {
        let first = usize::from(start.index());
        if buffer.is_empty() || first + buffer.len() > REGISTER_COUNT {
            return Err(BusError::RegisterRange {
                start: start.index(),
                len: buffer.len(),
            });
        }

        let address = self.address;
        self.i2c
            .write(address, &[start.index()])
            .map_err(|err| BusError::from_kind(err.kind(), address))?;
        self.i2c
            .read(address, buffer)
            .map_err(|err| BusError::from_kind(err.kind(), address))
    }

    /// Reads the whole register map in one burst.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] of the failing transaction.
    pub fn snapshot(&mut self) -> Result<RegisterSnapshot, BusError> {
        let mut raw = [0u8; REGISTER_COUNT];
        self.read_registers(Register::Reg00, &mut raw)?;
        Ok(RegisterSnapshot::new(raw))
    }

    /// Decodes REG08 into the charge cycle state.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] of the underlying read.
    pub fn charge_status(&mut self) -> Result<ChargeStatus, BusError> {
        self.read_register(Register::Reg08)
            .map(ChargeStatus::from_reg08)
    }

    /// Decodes REG0B into the part identification fields.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] of the underlying read.
    pub fn device_info(&mut self) -> Result<DeviceInfo, BusError> {
        self.read_register(Register::Reg0B).map(DeviceInfo::from_reg0b)
    }
}

/// Single register value captured by the [`RegisterProbe`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegisterReading {
    pub register: Register,
    pub value: u8,
}

impl fmt::Display for RegisterReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = 0x{:02x} ({})", self.register, self.value, self.value)
    }
}

/// Polls one charger register per acquisition.
pub struct RegisterProbe<I> {
    device: Sgm41511<I>,
    register: Register,
}

impl<I: I2c> RegisterProbe<I> {
    pub fn new(device: Sgm41511<I>, register: Register) -> Self {
        Self { device, register }
    }

    /// Builds the device handle from `config` and applies the optional reset.
    ///
    /// The caller is responsible for waiting out [`ChargerConfig::settle`]
    /// before calling this.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] of a failed reset.
    pub fn from_config(i2c: I, config: &ChargerConfig) -> Result<Self, BusError> {
        let mut device = Sgm41511::with_address(i2c, config.address);
        if config.reset_on_start {
            device.reset()?;
        }
        Ok(Self::new(device, config.status_register))
    }

    pub fn register(&self) -> Register {
        self.register
    }

    pub fn device(&self) -> &Sgm41511<I> {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Sgm41511<I> {
        &mut self.device
    }
}

impl<I: I2c> Probe for RegisterProbe<I> {
    type Output = RegisterReading;
    type Error = BusError;

    fn acquire(&mut self) -> Result<Self::Output, Self::Error> {
        let value = self.device.read_register(self.register)?;
        Ok(RegisterReading {
            register: self.register,
            value,
        })
    }
}
