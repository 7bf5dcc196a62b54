use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::Output;
use monitor_core::monitor::{Monitor, PinIndicator, RunForever};
use monitor_core::sampler::AveragingSampler;

use super::{CONSOLE, announce};
use crate::board::{self, ADC_CADENCE, SAMPLER};
use crate::hw::{AnalogChannel, TimerPacer};

#[embassy_executor::task]
pub async fn run(
    adc: Peri<'static, hal::peripherals::ADC1>,
    pin: Peri<'static, hal::peripherals::PA0>,
    led: Option<Output<'static>>,
) -> ! {
    let mut banner: heapless::String<48> = heapless::String::new();
    if core::fmt::write(
        &mut banner,
        format_args!("ADC monitor, measuring {}...", board::analog_pin_name()),
    )
    .is_ok()
    {
        announce(&banner);
    }

    let channel = AnalogChannel::new(Adc::new(adc), pin);
    let sampler = AveragingSampler::with_config(channel, SAMPLER);
    let mut monitor = Monitor::with_indicator(sampler, led.map(PinIndicator::new), ADC_CADENCE);

    let summary = monitor
        .run(&mut TimerPacer, RunForever, |outcome| {
            match outcome {
                Ok(reading) => defmt::info!(
                    "adc: raw={=u16:#x} volts={=f32}",
                    reading.raw,
                    reading.volts
                ),
                Err(fault) => defmt::warn!("adc: {}", defmt::Display2Format(fault)),
            }
            if CONSOLE.publish_outcome(outcome).is_err() {
                defmt::trace!("adc: console line dropped");
            }
        })
        .await;

    defmt::error!("adc: monitor stopped after {} iterations", summary.iterations);
    loop {
        core::future::pending::<()>().await;
    }
}
