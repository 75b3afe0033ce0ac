//! sysgpio provides exclusive, scoped access to a single Linux GPIO line
//! through the legacy sysfs interface (`/sys/class/gpio`), together with a
//! blocking wait loop for edge-triggered interrupts on that line.
//!
//! A [`GpioLine`] exports its line when it's acquired, and unexports it again
//! when it's released or dropped. The line can be configured as an input or
//! output, its polarity can be inverted, and edge detection can be enabled so
//! the value file's descriptor becomes exceptionally ready on every transition.
//! [`wait_for_edges`] consumes a configured line and reports each observed value
//! until a termination signal sets the process-wide [`ShutdownFlag`].
//!
//! sysgpio requires Linux. The sysfs GPIO interface is deprecated upstream in
//! favor of the `gpiochip` character device, but remains available on most
//! embedded kernels.
//!
//! [`GpioLine`]: gpio/struct.GpioLine.html
//! [`wait_for_edges`]: gpio/fn.wait_for_edges.html
//! [`ShutdownFlag`]: signal/struct.ShutdownFlag.html

#[macro_use]
mod macros;

pub mod config;
pub mod gpio;
pub mod signal;

pub use crate::config::Config;
pub use crate::gpio::{
    wait_for_edges, Direction, Edge, EdgeWait, EdgeWaiter, Error, GpioLine, Level, Polarity,
    Result, WaitOutcome,
};
pub use crate::signal::ShutdownFlag;
