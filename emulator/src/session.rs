use std::fs::{self, OpenOptions};
use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant as HostInstant};

use embassy_futures::block_on;
use monitor_core::board::{Application, BoardProfile, MissingCapability};
use monitor_core::charger::{ChargerConfig, RegisterProbe, Sgm41511};
use monitor_core::console;
use monitor_core::monitor::{
    Cadence, Monitor, Pacer, Probe, RunSummary, StatusIndicator, StopSignal,
};
use monitor_core::sampler::{AveragingSampler, SamplerConfig};

use crate::options::Options;
use crate::sim::{NoisySource, SimulatedCharger, SimulatedLed};

/// One emulator run: console output plus an optional transcript file.
pub struct Session<W: Write> {
    out: W,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

impl<W: Write> Session<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            transcript: None,
            started_at: HostInstant::now(),
        }
    }

    /// Mirrors everything the session prints into a transcript at `path`.
    pub fn with_transcript(mut self, path: &Path, header: &str) -> io::Result<Self> {
        self.transcript = Some(TranscriptLogger::create(path, header)?);
        Ok(self)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Checks `board` and runs the selected application until `stop` fires.
    pub fn run<P, S>(
        &mut self,
        board: &BoardProfile,
        options: &Options,
        pacer: &mut P,
        stop: S,
    ) -> io::Result<RunSummary>
    where
        P: Pacer,
        S: StopSignal,
    {
        if let Err(missing) = board.check(options.application) {
            self.emit(TranscriptRole::Emulator, &missing.to_string())?;
            return Err(unsupported(missing));
        }

        let summary = match options.application {
            Application::AdcMonitor => self.run_adc(options, pacer, stop)?,
            Application::ChargerProbe => self.run_charger(options, pacer, stop)?,
        };

        self.emit(
            TranscriptRole::Emulator,
            &format!(
                "stopped after {} iterations, {} faults",
                summary.iterations, summary.faults
            ),
        )?;
        Ok(summary)
    }

    fn run_adc<P: Pacer, S: StopSignal>(
        &mut self,
        options: &Options,
        pacer: &mut P,
        stop: S,
    ) -> io::Result<RunSummary> {
        let config = if options.nominal {
            SamplerConfig::NOMINAL
        } else {
            SamplerConfig::BOARD_TRIM
        };
        let cadence = if options.steady {
            Cadence::STEADY
        } else {
            Cadence::HEARTBEAT
        };

        self.emit(
            TranscriptRole::Device,
            &format!(
                "ADC monitor, measuring simulated A0 (level {} +/- {} counts)...",
                options.level, options.noise
            ),
        )?;

        let source = NoisySource::new(options.level, options.noise, config.max_raw())
            .with_fault_every(options.fault_every);
        let sampler = AveragingSampler::with_config(source, config);
        let mut monitor = Monitor::with_indicator(sampler, SimulatedLed::default(), cadence);

        let summary = self.drive(&mut monitor, pacer, stop)?;
        self.emit(
            TranscriptRole::Emulator,
            &format!("LED pulsed {} times", monitor.indicator().pulses()),
        )?;
        Ok(summary)
    }

    fn run_charger<P: Pacer, S: StopSignal>(
        &mut self,
        options: &Options,
        pacer: &mut P,
        stop: S,
    ) -> io::Result<RunSummary> {
        let config = ChargerConfig::DEFAULT;
        let cadence = if options.steady {
            Cadence::STEADY
        } else {
            Cadence::RAPID
        };

        self.emit(
            TranscriptRole::Device,
            "Hello, sgm41511! Reading raw data from registers...",
        )?;
        block_on(pacer.pause(config.settle));

        let bus = SimulatedCharger::new().with_fault_every(options.fault_every);
        let mut device = Sgm41511::with_address(bus, config.address);
        self.print_snapshot(&mut device)?;

        let probe = match RegisterProbe::from_config(device.release(), &config) {
            Ok(probe) => probe,
            Err(err) => {
                self.emit(TranscriptRole::Device, &format!("error: {err}"))?;
                return Ok(RunSummary::default());
            }
        };
        let mut monitor = Monitor::with_indicator(probe, SimulatedLed::default(), cadence);
        self.drive(&mut monitor, pacer, stop)
    }

    fn print_snapshot(&mut self, device: &mut Sgm41511<SimulatedCharger>) -> io::Result<()> {
        let snapshot = match device.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                return self.emit(TranscriptRole::Device, &format!("snapshot failed: {err}"));
            }
        };

        for (register, value) in snapshot.iter() {
            self.emit(
                TranscriptRole::Device,
                &format!("{register} = 0x{value:02x} ({value})"),
            )?;
        }
        self.emit(
            TranscriptRole::Device,
            &format!(
                "status: {}, power {}, {}",
                snapshot.charge_status(),
                if snapshot.power_good() { "good" } else { "absent" },
                snapshot.device_info()
            ),
        )
    }

    /// Runs `monitor` and prints every outcome as a console line.
    fn drive<Pr, L, P, S>(
        &mut self,
        monitor: &mut Monitor<Pr, L>,
        pacer: &mut P,
        stop: S,
    ) -> io::Result<RunSummary>
    where
        Pr: Probe,
        Pr::Output: fmt::Display,
        Pr::Error: fmt::Display,
        L: StatusIndicator,
        P: Pacer,
        S: StopSignal,
    {
        let mut failure: Option<io::Error> = None;

        let summary = block_on(monitor.run(pacer, stop, |outcome| {
            if failure.is_some() {
                return;
            }
            let result = match console::render_outcome(outcome) {
                Ok(line) => self.emit(TranscriptRole::Device, line.trim_end()),
                Err(overflow) => self.emit(TranscriptRole::Emulator, &overflow.to_string()),
            };
            if let Err(err) = result {
                failure = Some(err);
            }
        }));

        match failure {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    fn emit(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        // CRLF keeps lines aligned while the terminal is in raw mode.
        write!(self.out, "{line}\r\n")?;
        self.out.flush()?;

        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(self.started_at.elapsed(), role, line)?;
        }
        Ok(())
    }
}

fn unsupported(missing: MissingCapability) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, missing.to_string())
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path, header: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(header)?;
        Ok(logger)
    }

    fn write_header(&mut self, header: &str) -> io::Result<()> {
        writeln!(self.writer, "# {header}")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Copy, Clone)]
enum TranscriptRole {
    Device,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Device => "DEV <",
            TranscriptRole::Emulator => "EMU #",
        }
    }
}

#[cfg(test)]
mod tests {
    use monitor_core::monitor::IterationLimit;

    use super::*;
    use crate::sim::{HostPacer, SIMULATED_BOARD};

    fn lines(output: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(output)
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn quiet(application: Application, level: u16) -> Options {
        Options {
            application,
            level,
            noise: 0,
            fast: true,
            ..Options::default()
        }
    }

    #[test]
    fn adc_session_prints_averaged_readings() {
        let mut session = Session::new(Vec::new());
        let summary = session
            .run(
                &SIMULATED_BOARD,
                &quiet(Application::AdcMonitor, 409),
                &mut HostPacer::new(true),
                IterationLimit::new(3),
            )
            .unwrap();

        assert_eq!(summary.iterations, 3);
        let output = lines(&session.into_inner());
        assert!(output[0].starts_with("ADC monitor, measuring"));
        assert_eq!(
            &output[1..4],
            &["Raw value: 0x199, voltage: 0.650645 V"; 3]
        );
        assert_eq!(output[4], "LED pulsed 3 times");
        assert_eq!(output[5], "stopped after 3 iterations, 0 faults");
    }

    #[test]
    fn injected_faults_are_printed_and_counted() {
        let mut options = quiet(Application::AdcMonitor, 100);
        options.fault_every = Some(64);
        options.steady = true;

        let mut session = Session::new(Vec::new());
        let summary = session
            .run(
                &SIMULATED_BOARD,
                &options,
                &mut HostPacer::new(true),
                IterationLimit::new(4),
            )
            .unwrap();

        // Conversions 64 and 128 both land in a failing batch.
        assert_eq!(summary.faults, 2);
        let output = lines(&session.into_inner());
        let errors: Vec<_> = output
            .iter()
            .filter(|line| line.starts_with("error: analog read failed"))
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(output.contains(&"LED pulsed 0 times".to_string()));
    }

    #[test]
    fn charger_session_prints_snapshot_then_polls() {
        let mut session = Session::new(Vec::new());
        let summary = session
            .run(
                &SIMULATED_BOARD,
                &quiet(Application::ChargerProbe, 0),
                &mut HostPacer::new(true),
                IterationLimit::new(2),
            )
            .unwrap();

        assert_eq!(summary.iterations, 2);
        let output = lines(&session.into_inner());
        assert_eq!(
            output[0],
            "Hello, sgm41511! Reading raw data from registers..."
        );
        assert_eq!(output[1], "REG00 = 0x17 (23)");
        assert_eq!(output[12], "REG0B = 0x27 (39)");
        assert!(output[13].starts_with("status: pre-charge, power good"));
        assert_eq!(output[14], "REG0B = 0x27 (39)");
        assert_eq!(output[15], "REG0B = 0x27 (39)");
    }

    #[test]
    fn missing_capability_refuses_to_start() {
        let board = BoardProfile {
            charger_bus: None,
            ..SIMULATED_BOARD
        };
        let mut session = Session::new(Vec::new());
        let err = session
            .run(
                &board,
                &quiet(Application::ChargerProbe, 0),
                &mut HostPacer::new(true),
                IterationLimit::new(1),
            )
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        let output = lines(&session.into_inner());
        assert_eq!(
            output,
            vec!["charger-probe requires a board with charger bus pins".to_string()]
        );
    }

    #[test]
    fn transcript_records_timestamped_lines() {
        let path = std::env::temp_dir().join(format!(
            "monitor-emulator-transcript-{}.log",
            std::process::id()
        ));
        let mut session = Session::new(io::sink())
            .with_transcript(&path, "ADC transcript")
            .unwrap();
        session
            .run(
                &SIMULATED_BOARD,
                &quiet(Application::AdcMonitor, 2048),
                &mut HostPacer::new(true),
                IterationLimit::new(1),
            )
            .unwrap();
        drop(session);

        let text = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("# ADC transcript"));
        assert!(text.contains("] DEV < Raw value: 0x800, voltage: 3.258000 V"));
        assert!(text.contains("] EMU # stopped after 1 iterations, 0 faults"));
    }
}
