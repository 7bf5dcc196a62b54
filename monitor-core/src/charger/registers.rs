//! SGM41511 register map and field decoders.

use core::fmt;

/// Number of registers exposed by the charger.
pub const REGISTER_COUNT: usize = 12;

/// Byte-wide charger registers, in address order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Register {
    Reg00,
    Reg01,
    Reg02,
    Reg03,
    Reg04,
    Reg05,
    Reg06,
    Reg07,
    Reg08,
    Reg09,
    Reg0A,
    Reg0B,
}

impl Register {
    /// Every register in address order.
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::Reg00,
        Register::Reg01,
        Register::Reg02,
        Register::Reg03,
        Register::Reg04,
        Register::Reg05,
        Register::Reg06,
        Register::Reg07,
        Register::Reg08,
        Register::Reg09,
        Register::Reg0A,
        Register::Reg0B,
    ];

    /// Register address sent on the bus.
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Looks up a register by bus address.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_COUNT {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REG{:02X}", self.index())
    }
}

/// Charge cycle state reported in REG08 bits 4:3.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChargeStatus {
    NotCharging,
    PreCharge,
    FastCharge,
    Done,
}

impl ChargeStatus {
    const SHIFT: u8 = 3;
    const MASK: u8 = 0b11;

    #[must_use]
    pub const fn from_reg08(value: u8) -> Self {
        match (value >> Self::SHIFT) & Self::MASK {
            0 => ChargeStatus::NotCharging,
            1 => ChargeStatus::PreCharge,
            2 => ChargeStatus::FastCharge,
            _ => ChargeStatus::Done,
        }
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChargeStatus::NotCharging => "not-charging",
            ChargeStatus::PreCharge => "pre-charge",
            ChargeStatus::FastCharge => "fast-charge",
            ChargeStatus::Done => "charge-done",
        })
    }
}

/// Part identification fields from REG0B.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceInfo {
    /// Register reset still in progress (bit 7).
    pub reset_pending: bool,
    /// Part number (bits 6:3).
    pub part_number: u8,
    /// Silicon revision (bits 1:0).
    pub revision: u8,
}

impl DeviceInfo {
    #[must_use]
    pub const fn from_reg0b(value: u8) -> Self {
        Self {
            reset_pending: value & 0x80 != 0,
            part_number: (value >> 3) & 0x0F,
            revision: value & 0x03,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "part {:#x} rev {}{}",
            self.part_number,
            self.revision,
            if self.reset_pending { " (reset pending)" } else { "" }
        )
    }
}

/// Copy of the full register map captured in one burst.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegisterSnapshot {
    raw: [u8; REGISTER_COUNT],
}

impl RegisterSnapshot {
    #[must_use]
    pub const fn new(raw: [u8; REGISTER_COUNT]) -> Self {
        Self { raw }
    }

    #[must_use]
    pub const fn get(&self, register: Register) -> u8 {
        self.raw[register.index() as usize]
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; REGISTER_COUNT] {
        &self.raw
    }

    #[must_use]
    pub const fn charge_status(&self) -> ChargeStatus {
        ChargeStatus::from_reg08(self.get(Register::Reg08))
    }

    /// Input source is good (REG08 bit 2).
    #[must_use]
    pub const fn power_good(&self) -> bool {
        self.get(Register::Reg08) & 0x04 != 0
    }

    #[must_use]
    pub const fn device_info(&self) -> DeviceInfo {
        DeviceInfo::from_reg0b(self.get(Register::Reg0B))
    }

    /// Iterates `(register, value)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, u8)> + '_ {
        Register::ALL.iter().copied().zip(self.raw.iter().copied())
    }
}
