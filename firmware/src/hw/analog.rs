//! ADC1 sample source for the averaging sampler.

use core::convert::Infallible;

use embassy_stm32::adc::{Adc, AdcChannel, Resolution, SampleTime};
use embassy_stm32::peripherals::ADC1;
use monitor_core::sampler::SampleSource;

/// One ADC1 input with the converter it is read through.
pub struct AnalogChannel<'d, C> {
    adc: Adc<'d, ADC1>,
    channel: C,
}

impl<'d, C: AdcChannel<ADC1>> AnalogChannel<'d, C> {
    /// Configures 12-bit conversions with a long sample time for high
    /// impedance sources.
    pub fn new(mut adc: Adc<'d, ADC1>, channel: C) -> Self {
        adc.set_resolution(Resolution::BITS12);
        adc.set_sample_time(SampleTime::CYCLES160_5);
        Self { adc, channel }
    }
}

impl<C: AdcChannel<ADC1>> SampleSource for AnalogChannel<'_, C> {
    type Error = Infallible;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        Ok(self.adc.blocking_read(&mut self.channel))
    }
}
