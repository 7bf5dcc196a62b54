use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::gpio::Output;
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::time::Hertz;
use embassy_time::Timer;
use monitor_core::charger::RegisterProbe;
use monitor_core::monitor::{Monitor, PinIndicator, RunForever};

use super::{CONSOLE, announce};
use crate::board::{CHARGER, CHARGER_CADENCE};
use crate::hw::{TimerPacer, core_duration_to_embassy};

#[embassy_executor::task]
pub async fn run(
    peripheral: Peri<'static, hal::peripherals::I2C1>,
    scl: Peri<'static, hal::peripherals::PB6>,
    sda: Peri<'static, hal::peripherals::PB7>,
    led: Option<Output<'static>>,
) -> ! {
    announce("Hello, sgm41511! Reading raw data from registers...");

    let mut bus_config = i2c::Config::default();
    bus_config.frequency = Hertz(CHARGER.bus_frequency_hz);
    let bus = I2c::new_blocking(peripheral, scl, sda, bus_config);
    Timer::after(core_duration_to_embassy(CHARGER.settle)).await;

    match RegisterProbe::from_config(bus, &CHARGER) {
        Ok(probe) => {
            defmt::info!(
                "charger: polling {} at {=u8:#x}",
                defmt::Display2Format(&probe.register()),
                probe.device().address()
            );

            let mut monitor =
                Monitor::with_indicator(probe, led.map(PinIndicator::new), CHARGER_CADENCE);
            let summary = monitor
                .run(&mut TimerPacer, RunForever, |outcome| {
                    if let Err(err) = outcome {
                        defmt::warn!("charger: {}", defmt::Display2Format(err));
                    }
                    if CONSOLE.publish_outcome(outcome).is_err() {
                        defmt::trace!("charger: console line dropped");
                    }
                })
                .await;
            defmt::error!(
                "charger: probe stopped after {} iterations",
                summary.iterations
            );
        }
        Err(err) => {
            defmt::error!("charger: reset failed: {}", defmt::Display2Format(&err));
            announce("charger reset failed, probe not started");
        }
    }

    loop {
        core::future::pending::<()>().await;
    }
}
