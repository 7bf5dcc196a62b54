#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Wiring and per-application settings for the NUCLEO-G0B1RE carrier.
//!
//! The runtime checks [`BOARD`] against each [`Application`] before spawning
//! it, so a board revision without the charger header simply skips the probe.

use monitor_core::board::{AnalogInput, Application, BoardProfile, BusPins, PinAssignment};
use monitor_core::charger::ChargerConfig;
use monitor_core::monitor::Cadence;
use monitor_core::sampler::SamplerConfig;

/// Pins routed on the carrier board.
pub const BOARD: BoardProfile = BoardProfile {
    name: "nucleo-g0b1re",
    status_led: Some(PinAssignment::new("PA5", "LD4")),
    analog_input: Some(AnalogInput {
        pin: PinAssignment::new("PA0", "A0"),
        channel: 0,
    }),
    charger_bus: Some(BusPins {
        sda: PinAssignment::new("PB7", "SDA"),
        scl: PinAssignment::new("PB6", "SCL"),
    }),
};

/// Application that drives the status LED. Only one task can own the pin.
pub const LED_OWNER: Application = Application::AdcMonitor;

/// Converter scaling used by the ADC monitor.
pub const SAMPLER: SamplerConfig = SamplerConfig::BOARD_TRIM;

/// Loop timing for the ADC monitor.
pub const ADC_CADENCE: Cadence = Cadence::HEARTBEAT;

/// Charger bus and polling settings.
pub const CHARGER: ChargerConfig = ChargerConfig::DEFAULT;

/// Loop timing for the charger probe. Keeps the 100 ms poll period when the
/// LED belongs to the other application.
pub const CHARGER_CADENCE: Cadence = Cadence::RAPID;

/// Name of the analog pin, for the startup banner.
pub fn analog_pin_name() -> &'static str {
    BOARD
        .analog_input
        .map_or("unassigned", |input| input.pin.mcu_pin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_supports_every_application() {
        for application in Application::ALL {
            assert_eq!(BOARD.check(application), Ok(()));
        }
    }

    #[test]
    fn led_owner_has_a_led_to_drive() {
        assert!(BOARD.status_led.is_some());
        assert!(Application::ALL.contains(&LED_OWNER));
    }

    #[test]
    fn banner_names_the_measured_pin() {
        assert_eq!(analog_pin_name(), "PA0");
    }

    #[test]
    fn charger_cadence_matches_the_poll_period() {
        assert_eq!(
            CHARGER_CADENCE.period(),
            core::time::Duration::from_millis(100)
        );
    }
}
