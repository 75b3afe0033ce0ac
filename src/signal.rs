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

//! Cooperative shutdown on termination signals.
//!
//! [`install_handlers`] catches `SIGINT`, `SIGTERM`, `SIGUSR1` and `SIGUSR2`.
//! The first delivery of any of them sets the process-wide [`ShutdownFlag`]
//! returned by [`shutdown_flag`]. Each handler resets itself to the default action
//! after it runs, so a second delivery of the same signal terminates the process.
//!
//! The handlers are installed without `SA_RESTART`, which makes a blocking read
//! or wait return `EINTR` instead of silently resuming.
//!
//! [`install_handlers`]: fn.install_handlers.html
//! [`ShutdownFlag`]: struct.ShutdownFlag.html
//! [`shutdown_flag`]: fn.shutdown_flag.html

use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error};

use crate::gpio::{Error, Result};

/// Signals that request a shutdown.
pub const SHUTDOWN_SIGNALS: [(libc::c_int, &str); 4] = [
    (libc::SIGINT, "SIGINT"),
    (libc::SIGUSR1, "SIGUSR1"),
    (libc::SIGUSR2, "SIGUSR2"),
    (libc::SIGTERM, "SIGTERM"),
];

static SHUTDOWN: ShutdownFlag = ShutdownFlag::new();

/// An atomic flag used to request that a wait loop stops.
#[derive(Debug, Default)]
pub struct ShutdownFlag {
    requested: AtomicBool,
}

impl ShutdownFlag {
    /// Constructs a new, unset `ShutdownFlag`.
    pub const fn new() -> ShutdownFlag {
        ShutdownFlag {
            requested: AtomicBool::new(false),
        }
    }

    /// Requests a shutdown. Safe to call from a signal handler.
    #[inline]
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a shutdown has been requested.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Withdraws a pending shutdown request, so the flag can be reused.
    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

/// Returns the flag set by the signal handlers.
pub fn shutdown_flag() -> &'static ShutdownFlag {
    &SHUTDOWN
}

extern "C" fn handle_signal(_signum: libc::c_int) {
    SHUTDOWN.request();
}

/// Installs one-shot handlers for all [`SHUTDOWN_SIGNALS`].
///
/// [`SHUTDOWN_SIGNALS`]: constant.SHUTDOWN_SIGNALS.html
pub fn install_handlers() -> Result<()> {
    for &(signum, name) in SHUTDOWN_SIGNALS.iter() {
        let mut action: libc::sigaction = unsafe { mem::zeroed() };
        action.sa_sigaction = handle_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = libc::SA_RESETHAND;

        parse_retval!(unsafe { libc::sigemptyset(&mut action.sa_mask) })
            .map_err(|e| Error::io("sigemptyset", e))?;
        parse_retval!(unsafe { libc::sigaction(signum, &action, ptr::null_mut()) }).map_err(
            |e| {
                error!("Unable to set {} handler: {}", name, e);
                Error::io("sigaction", e)
            },
        )?;

        debug!("Installed {} handler", name);
    }

    Ok(())
}
