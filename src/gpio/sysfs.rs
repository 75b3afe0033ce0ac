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

//! Control-file layout and I/O for the sysfs GPIO interface.
//!
//! [`LinePaths`] derives a line's control-file paths from its number without
//! touching the filesystem. [`ControlFiles`] is the small set of filesystem
//! operations a [`GpioLine`] needs: an existence check and a single
//! open-write-close. [`Sysfs`] implements it against the real kernel interface.
//!
//! [`LinePaths`]: struct.LinePaths.html
//! [`ControlFiles`]: trait.ControlFiles.html
//! [`Sysfs`]: struct.Sysfs.html
//! [`GpioLine`]: ../struct.GpioLine.html

use std::fs::{File, OpenOptions};
use std::io;
use std::io::Write;
use std::os::unix::io::IntoRawFd;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::DEFAULT_SYSFS_ROOT;
use crate::gpio::{Error, Result};

/// Filesystem operations required to export and configure a GPIO line.
pub trait ControlFiles {
    /// Returns the directory containing the `export` and `unexport` files.
    fn root(&self) -> &Path;

    /// Returns `true` if `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Opens `path` for writing, writes `bytes` with a single call, and closes it.
    fn write_once(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Returns the path of the global export control file.
    fn export_path(&self) -> PathBuf {
        self.root().join("export")
    }

    /// Returns the path of the global unexport control file.
    fn unexport_path(&self) -> PathBuf {
        self.root().join("unexport")
    }
}

impl<T: ControlFiles + ?Sized> ControlFiles for &T {
    fn root(&self) -> &Path {
        (**self).root()
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn write_once(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        (**self).write_once(path, bytes)
    }

    fn export_path(&self) -> PathBuf {
        (**self).export_path()
    }

    fn unexport_path(&self) -> PathBuf {
        (**self).unexport_path()
    }
}

/// The kernel's sysfs GPIO interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    /// Constructs a new `Sysfs` rooted at `root`, normally `/sys/class/gpio`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Sysfs {
        Sysfs { root: root.into() }
    }
}

impl Default for Sysfs {
    fn default() -> Sysfs {
        Sysfs::new(DEFAULT_SYSFS_ROOT)
    }
}

impl ControlFiles for Sysfs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write_once(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        debug!("Writing {:?} to {}", String::from_utf8_lossy(bytes), path.display());

        let mut file = OpenOptions::new().write(true).open(path)?;
        let written = file.write(bytes)?;
        if written != bytes.len() {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }

        close(file)
    }
}

/// Closes `file`, returning any error reported by `close(2)`.
///
/// Dropping a `File` silently discards close errors.
pub(crate) fn close(file: File) -> io::Result<()> {
    let fd = file.into_raw_fd();
    parse_retval!(unsafe { libc::close(fd) })?;

    Ok(())
}

// Control-file contents are written with a trailing NUL, which sysfs ignores.
pub(crate) fn nul_terminated(s: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    bytes
}

/// Control-file paths for a single GPIO line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePaths {
    base: PathBuf,
    direction: PathBuf,
    value: PathBuf,
    edge: PathBuf,
    active_low: PathBuf,
}

impl LinePaths {
    /// Builds the paths for line `number` below `root`.
    ///
    /// No I/O is performed. Fails with `Error::OutOfMemory` if a path can't be
    /// allocated, or `Error::InvalidArgument` if `root` isn't valid UTF-8.
    pub fn new(root: &Path, number: &str) -> Result<LinePaths> {
        let root = root.to_str().ok_or_else(|| {
            Error::InvalidArgument(format!("sysfs root {} isn't valid UTF-8", root.display()))
        })?;
        let root = root.trim_end_matches('/');

        let base = concat(&[root, "/gpio", number])?;
        let direction = concat(&[&base, "/", "direction"])?;
        let value = concat(&[&base, "/", "value"])?;
        let edge = concat(&[&base, "/", "edge"])?;
        let active_low = concat(&[&base, "/", "active_low"])?;

        Ok(LinePaths {
            base: base.into(),
            direction: direction.into(),
            value: value.into(),
            edge: edge.into(),
            active_low: active_low.into(),
        })
    }

    /// Returns the line's directory, `<root>/gpio<N>`.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn direction(&self) -> &Path {
        &self.direction
    }

    pub fn value(&self) -> &Path {
        &self.value
    }

    pub fn edge(&self) -> &Path {
        &self.edge
    }

    pub fn active_low(&self) -> &Path {
        &self.active_low
    }
}

// Joins path fragments into a single string, reporting allocation failure
// instead of aborting.
fn concat(parts: &[&str]) -> Result<String> {
    let len = parts.iter().map(|part| part.len()).sum();

    let mut path = String::new();
    path.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;

    for part in parts {
        path.push_str(part);
    }

    Ok(path)
}
