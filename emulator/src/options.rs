//! Command-line options.

use std::path::PathBuf;
use std::str::FromStr;

use monitor_core::board::Application;

pub const USAGE: &str = "\
Usage: monitor-emulator [--app <adc|charger>] [--iterations <n>] [--level <raw>]
                        [--noise <counts>] [--fault-every <n>] [--fast] [--nominal]
                        [--steady] [--transcript <path>]
Press q, Esc or Ctrl-C to stop an interactive session.";

/// Settings for one emulator run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Options {
    pub application: Application,
    /// Iteration budget; `None` runs until a key stops the session.
    pub iterations: Option<u32>,
    /// Mean raw level produced by the simulated analog input.
    pub level: u16,
    /// Uniform noise amplitude around `level`, in counts.
    pub noise: u16,
    /// Inject a failure on every `n`th conversion or bus transaction.
    pub fault_every: Option<u32>,
    /// Skip all pacing delays.
    pub fast: bool,
    /// Use the nominal 3.3 V / 12-bit scale instead of the board trim.
    pub nominal: bool,
    /// Sleep without pulsing the LED.
    pub steady: bool,
    pub transcript: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            application: Application::AdcMonitor,
            iterations: None,
            level: 409,
            noise: 4,
            fault_every: None,
            fast: false,
            nominal: false,
            steady: false,
            transcript: None,
        }
    }
}

fn application_from_tag(tag: &str) -> Result<Application, String> {
    if tag.eq_ignore_ascii_case("adc") {
        Ok(Application::AdcMonitor)
    } else if tag.eq_ignore_ascii_case("charger") {
        Ok(Application::ChargerProbe)
    } else {
        Err(format!("Unknown application `{tag}`"))
    }
}

fn parse_number<T: FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value `{value}` for {flag}"))
}

/// Parses `args` (without the program name).
///
/// Flags accept `--flag value` and `--flag=value`.
pub fn parse_options<I>(args: I) -> Result<Options, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };

        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--app" => options.application = application_from_tag(&value()?)?,
            "--iterations" => options.iterations = Some(parse_number(&flag, &value()?)?),
            "--level" => options.level = parse_number(&flag, &value()?)?,
            "--noise" => options.noise = parse_number(&flag, &value()?)?,
            "--fault-every" => {
                let every: u32 = parse_number(&flag, &value()?)?;
                if every == 0 {
                    return Err("--fault-every must be at least 1".to_string());
                }
                options.fault_every = Some(every);
            }
            "--transcript" => options.transcript = Some(PathBuf::from(value()?)),
            "--fast" => options.fast = true,
            "--nominal" => options.nominal = true,
            "--steady" => options.steady = true,
            _ => return Err(format!("Unknown argument `{flag}`")),
        }
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, String> {
        parse_options(args.iter().map(|arg| (*arg).to_string()))
    }

    #[test]
    fn defaults_run_the_adc_monitor() {
        let options = parse(&[]).unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.application, Application::AdcMonitor);
    }

    #[test]
    fn accepts_separate_and_inline_values() {
        let options = parse(&[
            "--app",
            "charger",
            "--iterations=5",
            "--level",
            "2048",
            "--noise=0",
            "--fast",
            "--steady",
        ])
        .unwrap();

        assert_eq!(options.application, Application::ChargerProbe);
        assert_eq!(options.iterations, Some(5));
        assert_eq!(options.level, 2048);
        assert_eq!(options.noise, 0);
        assert!(options.fast);
        assert!(options.steady);
        assert!(!options.nominal);
    }

    #[test]
    fn transcript_path_is_kept() {
        let options = parse(&["--transcript", "logs/adc.log"]).unwrap();
        assert_eq!(options.transcript, Some(PathBuf::from("logs/adc.log")));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--app", "dac"]).is_err());
        assert!(parse(&["--level", "seventy"]).is_err());
        assert!(parse(&["--level", "70000"]).is_err());
        assert!(parse(&["--iterations"]).is_err());
        assert!(parse(&["--fault-every", "0"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
