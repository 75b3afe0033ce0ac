#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sysgpio::gpio::ControlFiles;
use tempfile::TempDir;

/// A sysfs GPIO tree in a temporary directory.
///
/// Writing to `export` materializes `gpio<N>/` with its control files, and
/// writing to `unexport` removes it again, like the kernel would. Every write
/// is recorded.
pub struct FakeSysfs {
    dir: TempDir,
    writes: RefCell<Vec<(String, Vec<u8>)>>,
    create_value: bool,
    fail_export: bool,
    initial_value: &'static [u8],
}

impl FakeSysfs {
    pub fn new() -> FakeSysfs {
        FakeSysfs {
            dir: tempfile::tempdir().unwrap(),
            writes: RefCell::new(Vec::new()),
            create_value: true,
            fail_export: false,
            initial_value: b"1\n",
        }
    }

    /// Exporting succeeds, but no value file shows up.
    pub fn without_value_file() -> FakeSysfs {
        FakeSysfs {
            create_value: false,
            ..FakeSysfs::new()
        }
    }

    pub fn failing_export() -> FakeSysfs {
        FakeSysfs {
            fail_export: true,
            ..FakeSysfs::new()
        }
    }

    pub fn with_initial_value(initial_value: &'static [u8]) -> FakeSysfs {
        FakeSysfs {
            initial_value,
            ..FakeSysfs::new()
        }
    }

    pub fn line_dir(&self, number: &str) -> PathBuf {
        self.dir.path().join(format!("gpio{}", number))
    }

    pub fn is_exported(&self, number: &str) -> bool {
        self.line_dir(number).exists()
    }

    pub fn read_control(&self, number: &str, name: &str) -> Vec<u8> {
        fs::read(self.line_dir(number).join(name)).unwrap()
    }

    pub fn set_value(&self, number: &str, value: &[u8]) {
        fs::write(self.line_dir(number).join("value"), value).unwrap();
    }

    /// Recorded writes as (path relative to the root, contents without NUL).
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes
            .borrow()
            .iter()
            .map(|(path, bytes)| {
                let text = String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .to_owned();
                (path.clone(), text)
            })
            .collect()
    }

    pub fn raw_writes(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.borrow().clone()
    }

    pub fn count_writes(&self, file: &str) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|(path, _)| path == file)
            .count()
    }

    fn export(&self, number: &str) -> io::Result<()> {
        if self.fail_export {
            return Err(io::Error::from_raw_os_error(libc::EACCES));
        }

        let line_dir = self.line_dir(number);
        if line_dir.exists() {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }

        fs::create_dir(&line_dir)?;
        fs::write(line_dir.join("direction"), b"in\n")?;
        fs::write(line_dir.join("edge"), b"none\n")?;
        fs::write(line_dir.join("active_low"), b"0\n")?;
        if self.create_value {
            fs::write(line_dir.join("value"), self.initial_value)?;
        }

        Ok(())
    }

    fn unexport(&self, number: &str) -> io::Result<()> {
        let line_dir = self.line_dir(number);
        if !line_dir.exists() {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        fs::remove_dir_all(line_dir)
    }
}

impl ControlFiles for FakeSysfs {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write_once(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let relative = path
            .strip_prefix(self.dir.path())
            .unwrap()
            .to_string_lossy()
            .into_owned();
        self.writes.borrow_mut().push((relative.clone(), bytes.to_vec()));

        let contents = String::from_utf8_lossy(bytes)
            .trim_end_matches('\0')
            .to_owned();

        match relative.as_str() {
            "export" => self.export(&contents),
            "unexport" => self.unexport(&contents),
            _ => {
                if !path.exists() {
                    return Err(io::Error::from_raw_os_error(libc::ENOENT));
                }
                fs::write(path, bytes)
            }
        }
    }
}
