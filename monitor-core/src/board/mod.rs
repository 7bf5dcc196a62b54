//! Board capability catalog checked once at startup.
//!
//! Each board is described by a const [`BoardProfile`] naming the pins wired to
//! the status LED, the analog input, and the charger bus. Applications declare
//! the [`Capability`] set they need and [`BoardProfile::check`] refuses to start
//! an application whose peripherals are missing.

use core::fmt;

/// MCU pin routed to a board function.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinAssignment {
    pub mcu_pin: &'static str,
    pub label: &'static str,
}

impl PinAssignment {
    #[must_use]
    pub const fn new(mcu_pin: &'static str, label: &'static str) -> Self {
        Self { mcu_pin, label }
    }
}

/// Analog input wiring.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AnalogInput {
    pub pin: PinAssignment,
    /// Converter input channel selected for this pin.
    pub channel: u8,
}

/// Two-wire bus wiring for the charger.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BusPins {
    pub sda: PinAssignment,
    pub scl: PinAssignment,
}

/// Peripheral a board may or may not provide.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Capability {
    StatusLed,
    AnalogInput,
    ChargerBus,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::StatusLed => "status LED",
            Capability::AnalogInput => "analog input",
            Capability::ChargerBus => "charger bus pins",
        })
    }
}

/// Monitoring applications the firmware can host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Application {
    AdcMonitor,
    ChargerProbe,
}

impl Application {
    pub const ALL: [Application; 2] = [Application::AdcMonitor, Application::ChargerProbe];

    /// Peripherals the application cannot run without. The status LED is
    /// optional everywhere.
    #[must_use]
    pub const fn requirements(self) -> &'static [Capability] {
        match self {
            Application::AdcMonitor => &[Capability::AnalogInput],
            Application::ChargerProbe => &[Capability::ChargerBus],
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Application::AdcMonitor => "adc-monitor",
            Application::ChargerProbe => "charger-probe",
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Startup check failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MissingCapability {
    pub application: Application,
    pub capability: Capability,
}

impl fmt::Display for MissingCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires a board with {}",
            self.application, self.capability
        )
    }
}

/// Pins present on a particular board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoardProfile {
    pub name: &'static str,
    pub status_led: Option<PinAssignment>,
    pub analog_input: Option<AnalogInput>,
    pub charger_bus: Option<BusPins>,
}

impl BoardProfile {
    #[must_use]
    pub const fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::StatusLed => self.status_led.is_some(),
            Capability::AnalogInput => self.analog_input.is_some(),
            Capability::ChargerBus => self.charger_bus.is_some(),
        }
    }

    /// Verifies every capability `application` needs.
    ///
    /// # Errors
    ///
    /// Returns the first [`MissingCapability`].
    pub fn check(&self, application: Application) -> Result<(), MissingCapability> {
        match application
            .requirements()
            .iter()
            .find(|capability| !self.has(**capability))
        {
            Some(&capability) => Err(MissingCapability {
                application,
                capability,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: BoardProfile = BoardProfile {
        name: "bare",
        status_led: None,
        analog_input: None,
        charger_bus: None,
    };

    #[test]
    fn bare_board_runs_nothing() {
        for app in Application::ALL {
            assert!(BARE.check(app).is_err());
        }
    }

    #[test]
    fn led_is_not_required() {
        let board = BoardProfile {
            analog_input: Some(AnalogInput {
                pin: PinAssignment::new("PA0", "AIN0"),
                channel: 0,
            }),
            ..BARE
        };
        assert_eq!(board.check(Application::AdcMonitor), Ok(()));
        assert!(!board.has(Capability::StatusLed));
    }
}
