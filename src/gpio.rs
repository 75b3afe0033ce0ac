//! Interface for a single sysfs GPIO line.
//!
//! sysgpio controls GPIO lines through the kernel's sysfs interface. Writing a line
//! number to `/sys/class/gpio/export` makes the kernel create a per-line directory
//! (`/sys/class/gpio/gpioN`) containing the `direction`, `value`, `edge` and
//! `active_low` control files. Writing the same number to `/sys/class/gpio/unexport`
//! removes it again.
//!
//! ## Lines
//!
//! A [`GpioLine`] is acquired with [`GpioLine::new`], which takes the line number as
//! a string of 1 to 10 ASCII digits. Acquiring a line that's already exported, either
//! by this process or by another one, returns `Err(`[`Error::ResourceBusy`]`)`. The line
//! stays exported until [`GpioLine::release`] is called, or the `GpioLine` goes out of
//! scope. Note that `drop` methods aren't called when a process is abnormally
//! terminated (for instance when a `SIGINT` signal isn't caught). Use
//! [`signal::install_handlers`] to turn termination signals into a cooperative
//! shutdown request.
//!
//! ## Interrupts
//!
//! After configuring a line as an input with an [`Edge`] other than [`Edge::None`],
//! the kernel flags the value file's descriptor as exceptionally ready on every
//! matching transition. [`wait_for_edges`] reads the current value, reports it, and
//! blocks until the next transition, until a shutdown is requested or an error occurs.
//!
//! ## Examples
//!
//! ```no_run
//! use sysgpio::gpio::{Direction, Edge, GpioLine};
//!
//! # fn main() -> sysgpio::gpio::Result<()> {
//! let mut line = GpioLine::new("23")?;
//! line.set_direction(Direction::In)?;
//! line.set_edge(Edge::Both)?;
//!
//! println!("GPIO 23 reads {}", line.level()?);
//!
//! line.release()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`GpioLine`]: struct.GpioLine.html
//! [`GpioLine::new`]: struct.GpioLine.html#method.new
//! [`GpioLine::release`]: struct.GpioLine.html#method.release
//! [`Error::ResourceBusy`]: enum.Error.html#variant.ResourceBusy
//! [`Edge`]: enum.Edge.html
//! [`Edge::None`]: enum.Edge.html#variant.None
//! [`wait_for_edges`]: fn.wait_for_edges.html
//! [`signal::install_handlers`]: ../signal/fn.install_handlers.html

use std::fmt;
use std::io;
use std::result;
use std::str::FromStr;

use thiserror::Error;

mod epoll;
mod interrupt;
mod line;
pub mod sysfs;

pub use self::interrupt::{wait_for_edges, EdgeWait, EdgeWaiter, WaitOutcome};
pub use self::line::GpioLine;
pub use self::sysfs::{ControlFiles, LinePaths, Sysfs};

/// Errors that can occur when accessing a GPIO line.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid argument.
    ///
    /// The GPIO number isn't a string of 1 to 10 ASCII digits, or a configuration
    /// value couldn't be parsed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// GPIO line is already exported.
    ///
    /// The line's sysfs directory already exists, which means it's in use by this
    /// or another process.
    #[error("GPIO {0} is already exported")]
    ResourceBusy(String),
    /// Unable to allocate memory for a control-file path.
    #[error("Out of memory")]
    OutOfMemory,
    /// I/O error.
    ///
    /// `op` names the operation that failed.
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
    /// Operation was interrupted by a signal.
    ///
    /// Returned instead of `Io` when a blocking call is interrupted, so callers can
    /// decide whether to retry or stop.
    #[error("Interrupted by signal")]
    Interrupted,
}

impl Error {
    /// Wraps an `io::Error`, keeping interruptions distinct from hard failures.
    pub(crate) fn io(op: &'static str, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::Interrupted {
            Error::Interrupted
        } else {
            Error::Io { op, source: err }
        }
    }

    // Matches the EIO the kernel would report for a malformed transfer.
    pub(crate) fn eio(op: &'static str) -> Error {
        Error::Io {
            op,
            source: io::Error::from_raw_os_error(libc::EIO),
        }
    }

    /// Returns `true` if the operation was interrupted by a signal.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }

    /// Returns the errno value that best describes this error.
    pub fn errno(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => libc::EINVAL,
            Error::ResourceBusy(_) => libc::EBUSY,
            Error::OutOfMemory => libc::ENOMEM,
            Error::Io { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
            Error::Interrupted => libc::EINTR,
        }
    }
}

/// Result type returned from methods that can have `sysgpio::gpio::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Line directions.
///
/// `Low` and `High` configure the line as an output and atomically set its
/// initial level, avoiding glitches.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Direction {
    In,
    Out,
    Low,
    High,
}

impl Direction {
    pub(crate) fn as_str(&self) -> &'static str {
        match *self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Low => "low",
            Direction::High => "high",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Direction> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "low" => Ok(Direction::Low),
            "high" => Ok(Direction::High),
            _ => Err(Error::InvalidArgument(format!("unknown direction '{}'", s))),
        }
    }
}

/// Interrupt trigger edges.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Edge {
    None,
    Rising,
    Falling,
    Both,
}

impl Edge {
    pub(crate) fn as_str(&self) -> &'static str {
        match *self {
            Edge::None => "none",
            Edge::Rising => "rising",
            Edge::Falling => "falling",
            Edge::Both => "both",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Edge {
    type Err = Error;

    fn from_str(s: &str) -> Result<Edge> {
        match s {
            "none" => Ok(Edge::None),
            "rising" => Ok(Edge::Rising),
            "falling" => Ok(Edge::Falling),
            "both" => Ok(Edge::Both),
            _ => Err(Error::InvalidArgument(format!("unknown edge '{}'", s))),
        }
    }
}

/// Line polarity.
///
/// With `ActiveLow`, the kernel inverts the value reported through (and written
/// to) the value file relative to the electrical level.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    // Contents of the active_low control file.
    pub(crate) fn as_str(&self) -> &'static str {
        match *self {
            Polarity::ActiveLow => "1",
            Polarity::ActiveHigh => "0",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Polarity::ActiveLow => write!(f, "active-low"),
            Polarity::ActiveHigh => write!(f, "active-high"),
        }
    }
}

impl FromStr for Polarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Polarity> {
        match s {
            "active-low" | "low" => Ok(Polarity::ActiveLow),
            "active-high" | "high" => Ok(Polarity::ActiveHigh),
            _ => Err(Error::InvalidArgument(format!("unknown polarity '{}'", s))),
        }
    }
}

/// Line logic levels.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl Level {
    /// Converts a raw value-file byte. Anything other than `'0'` is `High`.
    pub fn from_value(value: u8) -> Level {
        if value == b'0' {
            Level::Low
        } else {
            Level::High
        }
    }

    /// Returns the byte written to the value file for this level.
    pub fn as_value(&self) -> u8 {
        match *self {
            Level::Low => b'0',
            Level::High => b'1',
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Level::Low => write!(f, "Low"),
            Level::High => write!(f, "High"),
        }
    }
}
