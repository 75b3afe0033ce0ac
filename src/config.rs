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

//! Runtime configuration.
//!
//! The only tunable is the location of the sysfs GPIO class directory, which
//! defaults to `/sys/class/gpio`. It can be overridden through the
//! `SYSGPIO_SYSFS_ROOT` environment variable, which is mostly useful for running
//! against a fake sysfs tree.

use std::env;
use std::path::PathBuf;

use crate::gpio::Sysfs;

/// Default location of the sysfs GPIO class directory.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Environment variable overriding [`DEFAULT_SYSFS_ROOT`].
///
/// [`DEFAULT_SYSFS_ROOT`]: constant.DEFAULT_SYSFS_ROOT.html
pub const SYSFS_ROOT_ENV: &str = "SYSGPIO_SYSFS_ROOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory containing the `export` and `unexport` control files.
    pub sysfs_root: PathBuf,
}

impl Config {
    /// Constructs a `Config` from the environment, falling back to defaults.
    pub fn from_env() -> Config {
        match env::var_os(SYSFS_ROOT_ENV) {
            Some(root) if !root.is_empty() => Config {
                sysfs_root: PathBuf::from(root),
            },
            _ => Config::default(),
        }
    }

    /// Returns the control-file interface described by this configuration.
    pub fn sysfs(&self) -> Sysfs {
        Sysfs::new(self.sysfs_root.clone())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
        }
    }
}
