// Copyright (c) 2017-2024 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::fmt;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use log::{trace, warn};

use crate::gpio::epoll::{epoll_event, Epoll, EPOLLERR, EPOLLET, EPOLLPRI};
use crate::gpio::sysfs::ControlFiles;
use crate::gpio::{Error, GpioLine};
use crate::signal::ShutdownFlag;

/// Reason [`wait_for_edges`] stopped.
///
/// [`wait_for_edges`]: fn.wait_for_edges.html
#[derive(Debug)]
pub enum WaitOutcome {
    /// The shutdown flag was set and no error was pending.
    Shutdown,
    /// A blocking read or wait was interrupted by a signal.
    Interrupted,
    /// An I/O error occurred, or the wait returned something other than a
    /// single ready value descriptor.
    Failed(Error),
}

impl WaitOutcome {
    /// Returns `true` if the loop stopped because of an error.
    pub fn is_failure(&self) -> bool {
        matches!(self, WaitOutcome::Failed(_))
    }

    /// Converts the outcome into a `Result`, keeping only hard failures as errors.
    pub fn into_result(self) -> crate::gpio::Result<()> {
        match self {
            WaitOutcome::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            WaitOutcome::Shutdown => write!(f, "Shutdown requested"),
            WaitOutcome::Interrupted => write!(f, "Interrupted by signal"),
            WaitOutcome::Failed(ref err) => write!(f, "Failed: {}", err),
        }
    }
}

/// Blocks until a descriptor becomes exceptionally ready.
pub trait EdgeWait {
    /// Blocks without a timeout until at least one registered descriptor is
    /// exceptionally ready, storing the ready descriptors in `ready` and
    /// returning how many were stored.
    ///
    /// An interruption by a signal must be returned as an `io::Error` of kind
    /// `Interrupted`, and must not be retried.
    fn wait(&mut self, ready: &mut [RawFd]) -> io::Result<usize>;
}

/// Waits for edge events on a GPIO line's value descriptor.
///
/// Triggering an edge sets `POLLPRI` and `POLLERR` on the value file, which is
/// the same condition `select` reports through its exceptional descriptor set.
pub struct EdgeWaiter {
    poll: Epoll,
    events: [epoll_event; 2],
}

impl fmt::Debug for EdgeWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeWaiter")
            .field("poll", &self.poll)
            .field("events", &format_args!("{{ .. }}"))
            .finish()
    }
}

impl EdgeWaiter {
    /// Registers `source`'s descriptor for exceptional readiness.
    pub fn new<T: AsRawFd>(source: &T) -> crate::gpio::Result<EdgeWaiter> {
        let fd = source.as_raw_fd();

        let poll = Epoll::new().map_err(|e| Error::io("epoll_create1", e))?;
        poll.add(fd, fd as u64, EPOLLERR | EPOLLET | EPOLLPRI)
            .map_err(|e| Error::io("epoll_ctl", e))?;

        Ok(EdgeWaiter {
            poll,
            events: [epoll_event { events: 0, u64: 0 }; 2],
        })
    }
}

impl EdgeWait for EdgeWaiter {
    fn wait(&mut self, ready: &mut [RawFd]) -> io::Result<usize> {
        let num_events = self.poll.wait(&mut self.events, None)?;

        let mut stored = 0;
        for (event, slot) in self.events[..num_events].iter().zip(ready.iter_mut()) {
            *slot = event.u64 as RawFd;
            stored += 1;
        }

        Ok(stored)
    }
}

/// Reports the value of `line` every time an edge interrupt occurs.
///
/// Each iteration reads the current value and passes it to `on_value`, then
/// blocks in `waiter` until the next edge. The value is read before blocking, so
/// a value left pending by an earlier edge is reported right away. After each
/// wait, `shutdown` is checked, and the loop stops once it's set.
///
/// `line` should be configured as an input with an [`Edge`] other than
/// [`Edge::None`], otherwise the wait never returns.
///
/// An interrupted read or wait ends the loop with [`WaitOutcome::Interrupted`],
/// even if `shutdown` was set at the same time. It's never retried.
///
/// [`Edge`]: enum.Edge.html
/// [`Edge::None`]: enum.Edge.html#variant.None
/// [`WaitOutcome::Interrupted`]: enum.WaitOutcome.html#variant.Interrupted
pub fn wait_for_edges<F, W, C>(
    line: &mut GpioLine<F>,
    waiter: &mut W,
    shutdown: &ShutdownFlag,
    mut on_value: C,
) -> WaitOutcome
where
    F: ControlFiles,
    W: EdgeWait + ?Sized,
    C: FnMut(u8),
{
    let fd = line.as_raw_fd();

    loop {
        let value = match line.read_value() {
            Ok(value) => value,
            Err(Error::Interrupted) => return WaitOutcome::Interrupted,
            Err(err) => return WaitOutcome::Failed(err),
        };

        trace!("GPIO {} value {:?}", line.number(), value as char);
        on_value(value);

        let mut ready = [-1; 2];
        match waiter.wait(&mut ready) {
            Ok(1) if ready[0] == fd => {}
            Ok(count) => {
                warn!(
                    "Unexpected wait result for GPIO {}: {} ready, first {}",
                    line.number(),
                    count,
                    ready[0]
                );

                return WaitOutcome::Failed(Error::eio("epoll_wait"));
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                return WaitOutcome::Interrupted
            }
            Err(e) => return WaitOutcome::Failed(Error::io("epoll_wait", e)),
        }

        if shutdown.is_set() {
            return WaitOutcome::Shutdown;
        }
    }
}
