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
use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use log::{debug, warn};

use crate::gpio::sysfs::{self, ControlFiles, LinePaths, Sysfs};
use crate::gpio::{Direction, Edge, Error, Level, Polarity, Result};

// Longest accepted GPIO number, which also bounds what ends up in a path.
const MAX_NUMBER_DIGITS: usize = 10;

/// An exported GPIO line.
///
/// A `GpioLine` owns the line's export on the kernel side, its control-file paths,
/// and an open read-write descriptor for its value file. It's only ever returned
/// fully initialized: if any step of [`new`] fails, everything done up to that
/// point is rolled back first.
///
/// The line is unexported when [`release`] is called or the `GpioLine` goes out of
/// scope, whichever comes first.
///
/// [`new`]: #method.new
/// [`release`]: #method.release
pub struct GpioLine<F: ControlFiles = Sysfs> {
    number: String,
    paths: LinePaths,
    value: Option<File>,
    files: F,
}

impl GpioLine<Sysfs> {
    /// Exports GPIO line `number` through `/sys/class/gpio`.
    ///
    /// `number` must consist of 1 to 10 ASCII digits, otherwise
    /// `Err(`[`Error::InvalidArgument`]`)` is returned without touching the
    /// filesystem. If the line is already exported, `Err(`[`Error::ResourceBusy`]`)`
    /// is returned.
    ///
    /// [`Error::InvalidArgument`]: enum.Error.html#variant.InvalidArgument
    /// [`Error::ResourceBusy`]: enum.Error.html#variant.ResourceBusy
    pub fn new(number: &str) -> Result<GpioLine<Sysfs>> {
        GpioLine::with_control_files(number, Sysfs::default())
    }
}

impl<F: ControlFiles> GpioLine<F> {
    /// Exports GPIO line `number` using the specified control-file interface.
    pub fn with_control_files(number: &str, files: F) -> Result<GpioLine<F>> {
        validate_number(number)?;

        let paths = LinePaths::new(files.root(), number)?;

        // The line's directory only exists while it's exported.
        if files.exists(paths.base()) {
            return Err(Error::ResourceBusy(number.to_owned()));
        }

        let number_bytes = sysfs::nul_terminated(number);
        files
            .write_once(&files.export_path(), &number_bytes)
            .map_err(|e| Error::io("export", e))?;

        let value = match OpenOptions::new().read(true).write(true).open(paths.value()) {
            Ok(value) => value,
            Err(e) => {
                if let Err(unexport_err) = files.write_once(&files.unexport_path(), &number_bytes)
                {
                    warn!(
                        "Unable to unexport GPIO {} after failed open: {}",
                        number, unexport_err
                    );
                }

                return Err(Error::io("open value", e));
            }
        };

        debug!("Exported GPIO {}", number);

        Ok(GpioLine {
            number: number.to_owned(),
            paths,
            value: Some(value),
            files,
        })
    }

    /// Returns the GPIO number as it was passed to [`new`].
    ///
    /// [`new`]: #method.new
    #[inline]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Returns the line's control-file paths.
    #[inline]
    pub fn paths(&self) -> &LinePaths {
        &self.paths
    }

    /// Configures the line as an input or output.
    pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.write_control(self.paths.direction(), "direction", direction.as_str())
    }

    /// Configures which transitions make the value descriptor exceptionally ready.
    pub fn set_edge(&mut self, edge: Edge) -> Result<()> {
        self.write_control(self.paths.edge(), "edge", edge.as_str())
    }

    /// Configures whether the line's logic value is inverted.
    pub fn set_polarity(&mut self, polarity: Polarity) -> Result<()> {
        self.write_control(self.paths.active_low(), "active_low", polarity.as_str())
    }

    /// Reads the line's current value byte, usually `b'0'` or `b'1'`.
    ///
    /// Every call seeks back to the start of the value file and reads exactly one
    /// byte, so the returned value is always the live kernel state. If the read is
    /// interrupted by a signal, `Err(Error::Interrupted)` is returned and the read
    /// isn't retried.
    pub fn read_value(&mut self) -> Result<u8> {
        let mut buffer = [0u8; 1];
        let value = self.rewound_value()?;

        match value.read(&mut buffer) {
            Ok(1) => Ok(buffer[0]),
            Ok(_) => Err(Error::eio("read")),
            Err(e) => Err(Error::io("read", e)),
        }
    }

    /// Writes a single value byte to the line.
    ///
    /// Only meaningful when the line is configured as an output.
    pub fn write_value(&mut self, value: u8) -> Result<()> {
        let file = self.rewound_value()?;

        match file.write(&[value]) {
            Ok(1) => Ok(()),
            Ok(_) => Err(Error::eio("write")),
            Err(e) => Err(Error::io("write", e)),
        }
    }

    /// Reads the line's current logic level.
    pub fn level(&mut self) -> Result<Level> {
        Ok(Level::from_value(self.read_value()?))
    }

    /// Sets the line's logic level.
    pub fn set_level(&mut self, level: Level) -> Result<()> {
        self.write_value(level.as_value())
    }

    /// Unexports the line and closes its value file.
    ///
    /// The unexport is attempted even if closing the value file fails. The first
    /// error encountered is returned.
    pub fn release(mut self) -> Result<()> {
        self.teardown()
    }

    fn write_control(&self, path: &Path, op: &'static str, value: &str) -> Result<()> {
        self.files
            .write_once(path, &sysfs::nul_terminated(value))
            .map_err(|e| Error::io(op, e))
    }

    // Seeks the value file back to offset 0.
    fn rewound_value(&mut self) -> Result<&mut File> {
        let value = self
            .value
            .as_mut()
            .ok_or_else(|| Error::io("value", io::Error::from_raw_os_error(libc::EBADF)))?;

        match value.seek(SeekFrom::Start(0)) {
            Ok(0) => Ok(value),
            Ok(_) => Err(Error::eio("lseek")),
            Err(e) => Err(Error::io("lseek", e)),
        }
    }

    // Runs at most once per line. Both steps are always attempted.
    fn teardown(&mut self) -> Result<()> {
        let value = match self.value.take() {
            Some(value) => value,
            None => return Ok(()),
        };

        let closed = sysfs::close(value).map_err(|e| Error::io("close", e));
        if let Err(ref err) = closed {
            warn!("Unable to close value file of GPIO {}: {}", self.number, err);
        }

        let unexported = self
            .files
            .write_once(
                &self.files.unexport_path(),
                &sysfs::nul_terminated(&self.number),
            )
            .map_err(|e| Error::io("unexport", e));

        match unexported {
            Ok(()) => debug!("Unexported GPIO {}", self.number),
            Err(ref err) => warn!("Unable to unexport GPIO {}: {}", self.number, err),
        }

        closed.and(unexported)
    }
}

impl<F: ControlFiles> AsRawFd for GpioLine<F> {
    /// Returns the value file's descriptor.
    fn as_raw_fd(&self) -> RawFd {
        self.value.as_ref().map_or(-1, |value| value.as_raw_fd())
    }
}

impl<F: ControlFiles> Drop for GpioLine<F> {
    fn drop(&mut self) {
        // Errors are already logged by teardown.
        let _ = self.teardown();
    }
}

impl<F: ControlFiles> fmt::Debug for GpioLine<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioLine")
            .field("number", &self.number)
            .field("paths", &self.paths)
            .field("value", &self.value)
            .field("files", &format_args!("{{ .. }}"))
            .finish()
    }
}

fn validate_number(number: &str) -> Result<()> {
    if number.is_empty() || number.len() > MAX_NUMBER_DIGITS {
        return Err(Error::InvalidArgument(format!(
            "GPIO number must have 1 to {} digits, got {:?}",
            MAX_NUMBER_DIGITS, number
        )));
    }

    if !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidArgument(format!(
            "GPIO number must only contain digits, got {:?}",
            number
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_one_to_ten_digits() {
        assert!(validate_number("0").is_ok());
        assert!(validate_number("17").is_ok());
        assert!(validate_number("4294967295").is_ok());
        assert!(validate_number("9999999999").is_ok());
    }

    #[test]
    fn rejects_empty_long_or_non_digit_numbers() {
        for number in ["", "12345678901", "1a", "-1", " 4", "4/../5", "١٢"] {
            assert!(
                matches!(validate_number(number), Err(Error::InvalidArgument(_))),
                "{:?} should be rejected",
                number
            );
        }
    }
}
