//! The per-run log file.
//!
//! Truncated when a run begins, then opened for append. Child processes write
//! their stdout/stderr straight into it through duplicated handles, so lines
//! written here and by children share one file offset.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::Local;

use crate::error::{Error, Result};

pub const START_LABEL: &str = "Start Date/Time:";
pub const END_LABEL: &str = "End Date/Time:";

#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Create or truncate the log at `path`, creating parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
            })?;
        }

        File::create(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("truncate {}", path.display())))
        })?;

        let file = OpenOptions::new().append(true).open(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("open {}", path.display())))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start(&mut self) -> Result<()> {
        self.line(&format!("{} {}", START_LABEL, timestamp()))
    }

    pub fn finish(&mut self) -> Result<()> {
        self.line(&format!("{} {}", END_LABEL, timestamp()))
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.file, "{}", text).map_err(|e| self.write_error(e))
    }

    /// Append raw process output.
    pub fn write_output(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes).map_err(|e| self.write_error(e))
    }

    /// Handles a child can inherit for stdout and stderr.
    pub fn child_stdio(&self) -> Result<(Stdio, Stdio)> {
        let clone = || {
            self.file.try_clone().map_err(|e| {
                Error::internal_io(e.to_string(), Some(format!("share {}", self.path.display())))
            })
        };
        Ok((Stdio::from(clone()?), Stdio::from(clone()?)))
    }

    fn write_error(&self, e: std::io::Error) -> Error {
        Error::internal_io(e.to_string(), Some(format!("write {}", self.path.display())))
    }
}

/// `date`-style local timestamp.
fn timestamp() -> String {
    Local::now().format("%a %b %e %H:%M:%S %Z %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rikengo.log");
        fs::write(&path, "stale output from last night\n").unwrap();

        let mut log = RunLog::create(&path).unwrap();
        log.line("fresh").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn create_makes_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("annotload.log");

        let log = RunLog::create(&path).unwrap();

        assert!(path.exists());
        assert_eq!(log.path(), path.as_path());
    }

    #[test]
    fn start_and_finish_bracket_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotload.log");

        let mut log = RunLog::create(&path).unwrap();
        log.start().unwrap();
        log.write_output(b"loader says hi\n").unwrap();
        log.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(START_LABEL));
        assert_eq!(lines[1], "loader says hi");
        assert!(lines[2].starts_with(END_LABEL));
    }
}
