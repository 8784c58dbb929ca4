//! Helpers for the kernel's sysfs control files.
//!
//! Sysfs attributes are single small values that are rewritten in place: a
//! write always starts at offset zero and a read always re-reads from offset
//! zero. [`ControlFile`] keeps one attribute open for the lifetime of a
//! controller so repeated writes do not pay for an open/close each time.

use std::{
    fs::{self, File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    str::FromStr,
    thread,
    time::Duration,
};

use crate::{
    error::{Error, Result},
    tracing::prelude::*,
};

/// Delay between checks for a freshly exported control file.
pub const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Number of checks before an export is considered failed (~1 s in total).
pub const EXPORT_POLL_ATTEMPTS: u32 = 100;

/// An open sysfs attribute.
#[derive(Debug)]
pub struct ControlFile {
    path: PathBuf,
    file: File,
}

impl ControlFile {
    /// Open an attribute for writing only (`direction`, `period`, `enable`...).
    pub fn open_write(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().write(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Open an attribute for reading and writing (`value`).
    pub fn open_read_write(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Open an attribute for reading only.
    pub fn open_read(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the attribute from offset zero.
    pub fn write_value(&mut self, value: &str) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(value.as_bytes())?;
        // No-op on sysfs; drops stale bytes when the tree is a plain directory
        self.file.set_len(value.len() as u64)?;
        self.file.flush()?;
        Ok(())
    }

    /// Read the first byte of the attribute, or `None` if it is empty.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; 1];
        let n = self.file.read(&mut buf)?;
        Ok((n == 1).then_some(buf[0]))
    }
}

/// Write a value to an attribute that is only written once, such as
/// `export` or `unexport`.
pub fn write_once(path: &Path, value: &str) -> Result<()> {
    let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(value.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Read an attribute holding a decimal integer, such as a chip's `base`.
pub fn read_integer<T: FromStr>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    text.trim().parse().map_err(|_| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} does not hold an integer: {:?}", path.display(), text.trim()),
        ))
    })
}

/// Sorted names of the entries in `dir` that start with `prefix`.
///
/// Sorting makes "the first matching entry" independent of the order the
/// filesystem returns entries in.
pub fn entries_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Call `ready` up to `attempts` times, sleeping `interval` before each call.
///
/// Returns the number of the attempt that succeeded, or `None` once every
/// attempt has been used.
pub fn poll_until(
    attempts: u32,
    interval: Duration,
    mut ready: impl FnMut() -> bool,
) -> Option<u32> {
    for attempt in 1..=attempts {
        thread::sleep(interval);
        if ready() {
            return Some(attempt);
        }
    }
    None
}

/// Wait for every path in `paths` to exist after an export.
pub fn wait_for_files(paths: &[&Path]) -> Result<()> {
    let ready = || paths.iter().all(|p| p.exists());

    match poll_until(EXPORT_POLL_ATTEMPTS, EXPORT_POLL_INTERVAL, ready) {
        Some(attempt) => {
            trace!(attempt, path = %paths[0].display(), "Control files appeared");
            Ok(())
        }
        None => {
            let missing = paths
                .iter()
                .find(|p| !p.exists())
                .unwrap_or(&paths[0])
                .to_path_buf();
            Err(Error::ExportTimeout {
                path: missing,
                attempts: EXPORT_POLL_ATTEMPTS,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_poll_uses_every_attempt() {
        let mut calls = 0;
        let result = poll_until(100, Duration::ZERO, || {
            calls += 1;
            false
        });

        assert_eq!(result, None);
        assert_eq!(calls, 100);
    }

    #[test]
    fn test_poll_stops_at_first_success() {
        let mut calls = 0;
        let result = poll_until(100, Duration::ZERO, || {
            calls += 1;
            calls == 7
        });

        assert_eq!(result, Some(7));
        assert_eq!(calls, 7);
    }

    #[test]
    fn test_poll_sleeps_before_each_attempt() {
        let start = Instant::now();
        poll_until(5, Duration::from_millis(10), || false);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_for_missing_file_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gpio218/direction");

        let start = Instant::now();
        let err = wait_for_files(&[&missing]).unwrap_err();
        let elapsed = start.elapsed();

        match err {
            Error::ExportTimeout { path, attempts } => {
                assert_eq!(path, missing);
                assert_eq!(attempts, EXPORT_POLL_ATTEMPTS);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(elapsed >= Duration::from_secs(1));
    }

    #[test]
    fn test_control_file_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value");
        fs::write(&path, "0").unwrap();

        let mut file = ControlFile::open_read_write(&path).unwrap();
        file.write_value("1").unwrap();
        assert_eq!(file.read_byte().unwrap(), Some(b'1'));
        assert_eq!(fs::read_to_string(&path).unwrap(), "1");
    }

    #[test]
    fn test_shorter_value_replaces_longer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("period");
        fs::write(&path, "0").unwrap();

        let mut file = ControlFile::open_write(&path).unwrap();
        file.write_value("20000000").unwrap();
        file.write_value("1000").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "1000");
    }

    #[test]
    fn test_read_integer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base");
        fs::write(&path, "200\n").unwrap();
        assert_eq!(read_integer::<u32>(&path).unwrap(), 200);

        fs::write(&path, "abc").unwrap();
        assert!(read_integer::<u32>(&path).is_err());
    }

    #[test]
    fn test_entries_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["gpiochip300", "gpiochip0", "power", "uevent"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }

        let names = entries_with_prefix(dir.path(), "gpiochip").unwrap();
        assert_eq!(names, vec!["gpiochip0", "gpiochip300"]);
    }
}
