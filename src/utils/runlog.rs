// src/utils/runlog.rs

//! Append-only run log.
//!
//! One line per event, each prefixed with an ISO-8601 timestamp. Writes go
//! straight to the file handle so an event is on disk before the next one
//! is emitted; a crashed run's log ends at the last attempted operation.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{Local, SecondsFormat};

use crate::error::Result;

/// File-backed event log for one harvester run.
pub struct RunLogger {
    file: File,
}

impl RunLogger {
    /// Open the log file in append mode, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Append one timestamped event line.
    pub fn event(&mut self, message: &str) -> Result<()> {
        let stamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
        writeln!(self.file, "{stamp} {message}")?;
        Ok(())
    }
}
