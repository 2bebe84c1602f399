//! File + console logging with size-based rotation.

use anyhow::Context;
use radio_sync::config::LogConfig;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Returns the log file path.
///
/// `RUST_LOG` takes precedence over `log.level`.
pub fn init(log: &LogConfig) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(&log.path)
        .with_context(|| format!("Failed to create log directory {}", log.path.display()))?;
    let log_path = log.path.join(format!("{}.log", log.name));

    let file = RotatingFile::open(&log_path, log.max_bytes, log.backups)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.level)
            .with_context(|| format!("Invalid log level {:?}", log.level))?,
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_names(true);
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(filter)
        .init();

    Ok(log_path)
}

/// Append-only log file that rolls over to `<path>.1 .. <path>.<backups>`
/// once it would grow past `max_bytes`. `max_bytes == 0` disables rotation.
pub struct RotatingFile {
    state: Mutex<RotatingState>,
}

struct RotatingState {
    path: PathBuf,
    file: File,
    len: u64,
    max_bytes: u64,
    backups: u32,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, backups: u32) -> io::Result<Self> {
        let file = open_append(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            state: Mutex::new(RotatingState {
                path: path.to_path_buf(),
                file,
                len,
                max_bytes,
                backups,
            }),
        })
    }
}

impl RotatingState {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.backups == 0 {
            std::fs::remove_file(&self.path)?;
        } else {
            for i in (1..self.backups).rev() {
                let from = backup_path(&self.path, i);
                if from.exists() {
                    std::fs::rename(&from, backup_path(&self.path, i + 1))?;
                }
            }
            std::fs::rename(&self.path, backup_path(&self.path, 1))?;
        }
        self.file = open_append(&self.path)?;
        self.len = 0;
        Ok(())
    }
}

pub struct RotatingWriter<'a>(MutexGuard<'a, RotatingState>);

impl Write for RotatingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let state = &mut *self.0;
        if state.max_bytes > 0 && state.len > 0 && state.len + buf.len() as u64 > state.max_bytes {
            state.rotate()?;
        }
        let n = state.file.write(buf)?;
        state.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriter(self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_line(file: &RotatingFile, line: &str) {
        let mut w = file.make_writer();
        w.write_all(line.as_bytes()).unwrap();
        w.flush().unwrap();
    }

    #[test]
    fn test_rotates_past_max_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("radio-sync.log");
        let file = RotatingFile::open(&path, 10, 2).unwrap();

        write_line(&file, "aaaaaaaa\n");
        write_line(&file, "bbbbbbbb\n");
        write_line(&file, "cccccccc\n");
        write_line(&file, "dddddddd\n");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "dddddddd\n");
        assert_eq!(std::fs::read_to_string(backup_path(&path, 1)).unwrap(), "cccccccc\n");
        assert_eq!(std::fs::read_to_string(backup_path(&path, 2)).unwrap(), "bbbbbbbb\n");
        // oldest dropped
        assert!(!backup_path(&path, 3).exists());
    }

    #[test]
    fn test_zero_max_bytes_never_rotates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("radio-sync.log");
        let file = RotatingFile::open(&path, 0, 2).unwrap();
        for _ in 0..5 {
            write_line(&file, "line\n");
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n".repeat(5));
        assert!(!backup_path(&path, 1).exists());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("radio-sync.log");
        write_line(&RotatingFile::open(&path, 1024, 1).unwrap(), "first\n");
        write_line(&RotatingFile::open(&path, 1024, 1).unwrap(), "second\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/var/log/radio-sync.log"), 3),
            PathBuf::from("/var/log/radio-sync.log.3")
        );
    }
}
