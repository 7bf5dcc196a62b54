use std::io;
use std::path::Path;

#[allow(dead_code)]
#[path = "../options.rs"]
mod options;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;
#[allow(dead_code)]
#[path = "../sim.rs"]
mod sim;

use monitor_core::board::Application;
use monitor_core::monitor::IterationLimit;
use options::Options;
use session::Session;
use sim::{HostPacer, SIMULATED_BOARD};

const TRANSCRIPT_DIR: &str = "transcripts";

fn main() -> io::Result<()> {
    record(
        "adc-board-trim.log",
        "Monitor emulator ADC transcript (board trim)",
        &Options {
            level: 409,
            noise: 6,
            ..fast(Application::AdcMonitor)
        },
        5,
    )?;
    record(
        "adc-nominal.log",
        "Monitor emulator ADC transcript (nominal scale)",
        &Options {
            level: 2048,
            nominal: true,
            ..fast(Application::AdcMonitor)
        },
        5,
    )?;
    record(
        "adc-faults.log",
        "Monitor emulator ADC transcript (injected conversion faults)",
        &Options {
            fault_every: Some(80),
            ..fast(Application::AdcMonitor)
        },
        6,
    )?;
    record(
        "charger.log",
        "Monitor emulator charger transcript",
        &fast(Application::ChargerProbe),
        5,
    )?;
    Ok(())
}

fn fast(application: Application) -> Options {
    Options {
        application,
        fast: true,
        ..Options::default()
    }
}

fn record(file: &str, header: &str, options: &Options, iterations: u32) -> io::Result<()> {
    let path = Path::new(TRANSCRIPT_DIR).join(file);
    let mut session = Session::new(io::sink()).with_transcript(&path, header)?;
    session.run(
        &SIMULATED_BOARD,
        options,
        &mut HostPacer::new(options.fast),
        IterationLimit::new(iterations),
    )?;
    println!("wrote {}", path.display());
    Ok(())
}
