//! Fixed-capacity console lines.
//!
//! Readings are rendered through their `Display` impls into a
//! [`heapless::String`] so the firmware can queue them for the USB console
//! without an allocator. Lines carry a CRLF terminator for serial terminals.

use core::fmt::{self, Write};

use heapless::String;

/// Maximum bytes in one console line, terminator included.
pub const CONSOLE_LINE_CAPACITY: usize = 96;

/// Rendered console line.
pub type ConsoleLine = String<CONSOLE_LINE_CAPACITY>;

const TERMINATOR: &str = "\r\n";

/// The rendered text did not fit into [`CONSOLE_LINE_CAPACITY`] bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LineOverflow;

impl fmt::Display for LineOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "console line exceeds {CONSOLE_LINE_CAPACITY} bytes")
    }
}

/// Renders `value` followed by CRLF.
///
/// # Errors
///
/// Returns [`LineOverflow`] when the text does not fit.
pub fn render_line<T: fmt::Display + ?Sized>(value: &T) -> Result<ConsoleLine, LineOverflow> {
    let mut line = ConsoleLine::new();
    write!(line, "{value}").map_err(|_| LineOverflow)?;
    line.push_str(TERMINATOR).map_err(|_| LineOverflow)?;
    Ok(line)
}

/// Renders a probe outcome: the value on success, `error: <cause>` otherwise.
///
/// # Errors
///
/// Returns [`LineOverflow`] when the text does not fit.
pub fn render_outcome<T, E>(outcome: Result<&T, &E>) -> Result<ConsoleLine, LineOverflow>
where
    T: fmt::Display,
    E: fmt::Display,
{
    match outcome {
        Ok(value) => render_line(value),
        Err(error) => render_line(&format_args!("error: {error}")),
    }
}
