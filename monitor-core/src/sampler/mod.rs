//! Averaged analog sampling shared by firmware and host targets.
//!
//! The sampler owns a [`SampleSource`] (the analog driver collaborator) and a
//! [`SamplerConfig`] describing the batch size and the linear scale applied to
//! the averaged reading. Nothing here depends on a particular ADC peripheral, so
//! the firmware binds it to the Embassy ADC driver while the emulator and the
//! tests feed it scripted samples.

use core::{convert::Infallible, fmt};

use crate::monitor::Probe;

/// Number of raw samples averaged per reading.
pub const DEFAULT_BATCH_SIZE: u16 = 32;

/// Widest converter or scale supported by the `u16` sample type.
pub const MAX_BITS: u8 = 16;

/// Blocking raw-sample primitive provided by the analog driver.
///
/// The input channel must already be configured for high-impedance analog
/// input and selected before the first read.
pub trait SampleSource {
    /// Failure reported by the driver. Use [`Infallible`] for register reads
    /// that cannot fail.
    type Error;

    /// Blocks until one conversion completes and returns the raw value.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    type Error = S::Error;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        (**self).read_raw()
    }
}

/// Source that always returns the same value. Handy for bring-up and tests.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConstantSource(pub u16);

impl SampleSource for ConstantSource {
    type Error = Infallible;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        Ok(self.0)
    }
}

/// Rejected [`SamplerConfig`] parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Batches must hold at least one sample.
    EmptyBatch,
    /// Reference voltage must be finite and strictly positive.
    InvalidReference(f32),
    /// Scale exponent outside `1..=16`.
    ScaleBits(u8),
    /// Converter width outside `1..=16`.
    ConverterBits(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyBatch => f.write_str("batch size must be at least 1"),
            ConfigError::InvalidReference(volts) => {
                write!(f, "reference voltage {volts} is not a positive finite value")
            }
            ConfigError::ScaleBits(bits) => write!(f, "scale bits {bits} outside 1..={MAX_BITS}"),
            ConfigError::ConverterBits(bits) => {
                write!(f, "converter bits {bits} outside 1..={MAX_BITS}")
            }
        }
    }
}

/// Batch size and linear scale applied by the [`AveragingSampler`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SamplerConfig {
    batch_size: u16,
    reference_volts: f32,
    scale_bits: u8,
    converter_bits: u8,
}

impl SamplerConfig {
    /// Trim used on the bench board: 3.258 V against an 11-bit divisor while
    /// the converter itself delivers 12-bit samples.
    pub const BOARD_TRIM: Self = Self {
        batch_size: DEFAULT_BATCH_SIZE,
        reference_volts: 3.258,
        scale_bits: 11,
        converter_bits: 12,
    };

    /// Datasheet values: 12-bit conversion against a 3.3 V reference.
    pub const NOMINAL: Self = Self {
        batch_size: DEFAULT_BATCH_SIZE,
        reference_volts: 3.3,
        scale_bits: 12,
        converter_bits: 12,
    };

    /// Validates and builds a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the batch is empty, the reference is not a
    /// positive finite voltage, or either bit width is outside `1..=16`.
    pub fn new(
        batch_size: u16,
        reference_volts: f32,
        scale_bits: u8,
        converter_bits: u8,
    ) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::EmptyBatch);
        }
        if !reference_volts.is_finite() || reference_volts <= 0.0 {
            return Err(ConfigError::InvalidReference(reference_volts));
        }
        if scale_bits == 0 || scale_bits > MAX_BITS {
            return Err(ConfigError::ScaleBits(scale_bits));
        }
        if converter_bits == 0 || converter_bits > MAX_BITS {
            return Err(ConfigError::ConverterBits(converter_bits));
        }

        Ok(Self {
            batch_size,
            reference_volts,
            scale_bits,
            converter_bits,
        })
    }

    /// Returns a copy with a different batch size.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyBatch`] for a zero batch.
    pub fn with_batch_size(self, batch_size: u16) -> Result<Self, ConfigError> {
        Self::new(
            batch_size,
            self.reference_volts,
            self.scale_bits,
            self.converter_bits,
        )
    }

    #[must_use]
    pub const fn batch_size(&self) -> u16 {
        self.batch_size
    }

    #[must_use]
    pub const fn reference_volts(&self) -> f32 {
        self.reference_volts
    }

    #[must_use]
    pub const fn scale_bits(&self) -> u8 {
        self.scale_bits
    }

    #[must_use]
    pub const fn converter_bits(&self) -> u8 {
        self.converter_bits
    }

    /// Largest raw value the converter can report.
    #[must_use]
    pub const fn max_raw(&self) -> u16 {
        ((1u32 << self.converter_bits) - 1) as u16
    }

    /// Volts represented by one count of the averaged reading.
    #[must_use]
    pub fn volts_per_count(&self) -> f32 {
        // Powers of two up to 2^16 are exact in f32.
        #[allow(clippy::cast_precision_loss)]
        let divisor = (1u32 << self.scale_bits) as f32;
        self.reference_volts / divisor
    }

    /// Converts an averaged reading into volts.
    #[must_use]
    pub fn to_volts(&self, raw: u16) -> f32 {
        f32::from(raw) * self.volts_per_count()
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::BOARD_TRIM
    }
}

/// Averaged reading together with its converted voltage.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading {
    /// Truncated mean of the batch.
    pub raw: u16,
    /// `raw` scaled by the configured reference.
    pub volts: f32,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Raw value: 0x{:03x}, voltage: {:.6} V", self.raw, self.volts)
    }
}

/// Driver failure that interrupted a batch.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HardwareFault<E> {
    /// Samples read successfully before the failure.
    pub completed: u16,
    /// Error reported by the driver.
    pub cause: E,
}

impl<E: fmt::Debug> fmt::Display for HardwareFault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analog read failed after {} samples: {:?}",
            self.completed, self.cause
        )
    }
}

/// Batches raw samples from a [`SampleSource`] and converts the mean to volts.
pub struct AveragingSampler<S> {
    source: S,
    config: SamplerConfig,
}

impl<S: SampleSource> AveragingSampler<S> {
    /// Creates a sampler using the [`SamplerConfig::BOARD_TRIM`] scale.
    pub fn new(source: S) -> Self {
        Self::with_config(source, SamplerConfig::default())
    }

    /// Creates a sampler with an explicit configuration.
    pub fn with_config(source: S, config: SamplerConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consumes the sampler and returns the wrapped source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Reads one batch, averages it with truncating division, and scales the
    /// mean into volts.
    ///
    /// Samples are not range checked; the driver is trusted to stay within the
    /// converter's native range.
    ///
    /// # Errors
    ///
    /// Returns a [`HardwareFault`] as soon as the source fails. Partial batches
    /// are discarded rather than averaged.
    pub fn sample_and_convert(&mut self) -> Result<Reading, HardwareFault<S::Error>> {
        let batch = self.config.batch_size;
        let mut sum: u32 = 0;

        for completed in 0..batch {
            let sample = self
                .source
                .read_raw()
                .map_err(|cause| HardwareFault { completed, cause })?;
            sum += u32::from(sample);
        }

        // The mean of u16 values always fits back into a u16.
        #[allow(clippy::cast_possible_truncation)]
        let raw = (sum / u32::from(batch)) as u16;

        Ok(Reading {
            raw,
            volts: self.config.to_volts(raw),
        })
    }
}

impl<S: SampleSource> Probe for AveragingSampler<S> {
    type Output = Reading;
    type Error = HardwareFault<S::Error>;

    fn acquire(&mut self) -> Result<Self::Output, Self::Error> {
        self.sample_and_convert()
    }
}
