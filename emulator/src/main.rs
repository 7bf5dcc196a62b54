mod options;
mod session;
mod sim;

use std::env;
use std::io::{self, Write};
use std::process;

use monitor_core::board::Application;
use options::{Options, USAGE, parse_options};
use session::Session;
use sim::{HostPacer, KeyStop, SIMULATED_BOARD, SessionStop};

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdout = io::stdout();
    let mut session = Session::new(stdout.lock());
    if let Some(path) = options.transcript.as_deref() {
        session = session.with_transcript(path, transcript_header(&options))?;
    }

    let keys = KeyStop::attach()?;
    let stop = SessionStop::new(options.iterations, keys);
    if stop.raw_mode() {
        let mut out = io::stderr();
        write!(out, "Press q, Esc or Ctrl-C to stop.\r\n")?;
        out.flush()?;
    }

    let mut pacer = HostPacer::new(options.fast);
    let result = session.run(&SIMULATED_BOARD, &options, &mut pacer, stop);
    if let Err(err) = &result {
        eprintln!("{err}");
    }
    result.map(|_| ())
}

fn transcript_header(options: &Options) -> &'static str {
    match options.application {
        Application::AdcMonitor => "Monitor emulator ADC transcript",
        Application::ChargerProbe => "Monitor emulator charger transcript",
    }
}
