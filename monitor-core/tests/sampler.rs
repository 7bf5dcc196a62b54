use core::convert::Infallible;

use monitor_core::sampler::{
    AveragingSampler, ConstantSource, DEFAULT_BATCH_SIZE, HardwareFault, SampleSource,
    SamplerConfig,
};

/// Replays a fixed slice of samples, wrapping around at the end.
struct Replay<'a> {
    samples: &'a [u16],
    cursor: usize,
}

impl<'a> Replay<'a> {
    fn new(samples: &'a [u16]) -> Self {
        Self { samples, cursor: 0 }
    }
}

impl SampleSource for Replay<'_> {
    type Error = Infallible;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        let sample = self.samples[self.cursor % self.samples.len()];
        self.cursor += 1;
        Ok(sample)
    }
}

/// Fails on the given read index.
struct FailsAt {
    index: usize,
    reads: usize,
}

#[derive(Debug, PartialEq, Eq)]
struct ConversionTimeout;

impl SampleSource for FailsAt {
    type Error = ConversionTimeout;

    fn read_raw(&mut self) -> Result<u16, Self::Error> {
        let current = self.reads;
        self.reads += 1;
        if current == self.index {
            Err(ConversionTimeout)
        } else {
            Ok(4095)
        }
    }
}

/// Small deterministic generator so the property test covers varied batches.
struct Lcg(u32);

impl Lcg {
    fn next_sample(&mut self) -> u16 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        ((self.0 >> 16) % 4096) as u16
    }
}

#[test]
fn default_batch_is_thirty_two() {
    assert_eq!(SamplerConfig::default().batch_size(), DEFAULT_BATCH_SIZE);
    assert_eq!(DEFAULT_BATCH_SIZE, 32);
}

#[test]
fn averaged_reading_is_floor_of_mean_for_any_batch() {
    let mut rng = Lcg(0x1234_5678);

    for _ in 0..500 {
        let mut batch = [0u16; 32];
        for sample in batch.iter_mut() {
            *sample = rng.next_sample();
        }
        let sum: u32 = batch.iter().map(|&s| u32::from(s)).sum();

        let mut sampler = AveragingSampler::new(Replay::new(&batch));
        let reading = sampler.sample_and_convert().unwrap();

        assert_eq!(u32::from(reading.raw), sum / 32);
        assert!(reading.raw <= 4095);
    }
}

#[test]
fn single_spike_is_diluted() {
    let mut batch = [0u16; 32];
    batch[31] = 4095;
    let mut sampler = AveragingSampler::new(Replay::new(&batch));

    assert_eq!(sampler.sample_and_convert().unwrap().raw, 127);
}

#[test]
fn half_scale_at_eleven_bits_equals_reference() {
    let mut sampler = AveragingSampler::new(ConstantSource(2048));
    let reading = sampler.sample_and_convert().unwrap();

    assert_eq!(reading.raw, 2048);
    assert_eq!(reading.volts, SamplerConfig::BOARD_TRIM.reference_volts());
    assert_eq!(reading.volts, 3.258);
}

#[test]
fn zero_input_is_zero_volts() {
    let mut sampler = AveragingSampler::new(ConstantSource(0));
    let reading = sampler.sample_and_convert().unwrap();

    assert_eq!(reading.raw, 0);
    assert_eq!(reading.volts, 0.0);
}

#[test]
fn identical_sequences_give_identical_readings() {
    let batch: [u16; 32] = core::array::from_fn(|i| (i as u16) * 97);

    let mut first = AveragingSampler::new(Replay::new(&batch));
    let mut second = AveragingSampler::new(Replay::new(&batch));
    let a = first.sample_and_convert().unwrap();
    let b = second.sample_and_convert().unwrap();
    assert_eq!(a, b);

    // Same sampler, next batch replays the same slice again.
    let c = first.sample_and_convert().unwrap();
    assert_eq!(a, c);
}

#[test]
fn batch_of_one_returns_the_sample() {
    let config = SamplerConfig::BOARD_TRIM.with_batch_size(1).unwrap();
    let samples = [1234u16, 7];
    let mut sampler = AveragingSampler::with_config(Replay::new(&samples), config);

    assert_eq!(sampler.sample_and_convert().unwrap().raw, 1234);
    assert_eq!(sampler.sample_and_convert().unwrap().raw, 7);
}

#[test]
fn ten_percent_of_full_scale() {
    let mut sampler = AveragingSampler::new(ConstantSource(409));
    let reading = sampler.sample_and_convert().unwrap();

    assert_eq!(reading.raw, 409);
    assert!((reading.volts - 0.650).abs() < 0.001, "got {}", reading.volts);
}

#[test]
fn nominal_scale_uses_twelve_bits() {
    let mut sampler = AveragingSampler::with_config(ConstantSource(2048), SamplerConfig::NOMINAL);
    let reading = sampler.sample_and_convert().unwrap();

    assert_eq!(reading.volts, 1.65);
}

#[test]
fn failing_read_aborts_the_batch() {
    let mut sampler = AveragingSampler::new(FailsAt { index: 5, reads: 0 });

    assert_eq!(
        sampler.sample_and_convert(),
        Err(HardwareFault {
            completed: 5,
            cause: ConversionTimeout,
        })
    );
    assert_eq!(sampler.source().reads, 6);
}

#[test]
fn reading_renders_like_the_console() {
    let mut sampler = AveragingSampler::new(ConstantSource(409));
    let reading = sampler.sample_and_convert().unwrap();
    let line = monitor_core::console::render_line(&reading).unwrap();

    assert_eq!(line.as_str(), "Raw value: 0x199, voltage: 0.650645 V\r\n");
}
