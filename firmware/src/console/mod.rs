#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Console line queue shared by the monitor tasks and the USB console.
//!
//! Monitor tasks never block on the host: a full queue drops the line and
//! bumps a counter that the USB task reports once a terminal attaches.

use core::fmt;

use embassy_sync::channel::{Channel, Receiver, TrySendError};
use monitor_core::console::{self, ConsoleLine};
use portable_atomic::{AtomicU32, Ordering};

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;

#[cfg(target_os = "none")]
type ConsoleMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type ConsoleMutex = NoopRawMutex;

/// Lines buffered while no host is reading.
pub const CONSOLE_QUEUE_DEPTH: usize = 8;

/// Channel carrying rendered lines toward the USB console.
pub type ConsoleChannel = Channel<ConsoleMutex, ConsoleLine, CONSOLE_QUEUE_DEPTH>;

/// Receiver drained by the USB console task.
pub type ConsoleReceiver<'a> = Receiver<'a, ConsoleMutex, ConsoleLine, CONSOLE_QUEUE_DEPTH>;

/// Why a line never reached the queue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PublishError {
    /// The queue already held [`CONSOLE_QUEUE_DEPTH`] lines.
    QueueFull,
    /// The rendered text exceeded the line capacity.
    Overflow,
}

/// Bounded line queue plus a dropped-line counter.
pub struct ConsoleQueue {
    lines: ConsoleChannel,
    dropped: AtomicU32,
}

impl ConsoleQueue {
    pub const fn new() -> Self {
        Self {
            lines: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queues an already rendered line.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::QueueFull`] and counts the drop when no slot is free.
    pub fn publish(&self, line: ConsoleLine) -> Result<(), PublishError> {
        match self.lines.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.note_drop();
                Err(PublishError::QueueFull)
            }
        }
    }

    /// Renders `text` as one line and queues it.
    ///
    /// # Errors
    ///
    /// Counts and reports the drop when rendering or queueing fails.
    pub fn publish_text<T: fmt::Display + ?Sized>(&self, text: &T) -> Result<(), PublishError> {
        match console::render_line(text) {
            Ok(line) => self.publish(line),
            Err(_) => {
                self.note_drop();
                Err(PublishError::Overflow)
            }
        }
    }

    /// Renders a probe outcome and queues it.
    ///
    /// # Errors
    ///
    /// Counts and reports the drop when rendering or queueing fails.
    pub fn publish_outcome<T, E>(&self, outcome: Result<&T, &E>) -> Result<(), PublishError>
    where
        T: fmt::Display,
        E: fmt::Display,
    {
        match console::render_outcome(outcome) {
            Ok(line) => self.publish(line),
            Err(_) => {
                self.note_drop();
                Err(PublishError::Overflow)
            }
        }
    }

    pub fn receiver(&self) -> ConsoleReceiver<'_> {
        self.lines.receiver()
    }

    /// Returns and clears the number of lines dropped so far.
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    fn note_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}
