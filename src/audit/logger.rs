//! Audit logger for writing audit entries to file.
//!
//! Writes structured audit entries as JSON lines (one JSON object per
//! line) for easy parsing by log analysis tools.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::GateError;

use super::entry::AuditEntry;

/// Logger for audit entries.
///
/// Writes audit entries to a file in JSON lines format.
/// Thread-safe via internal mutex.
pub struct AuditLogger {
    /// The file handle wrapped in a mutex for thread safety.
    file: Mutex<File>,
    /// Path to the audit log file.
    path: PathBuf,
}

impl AuditLogger {
    /// Create a new audit logger that writes to the specified path.
    ///
    /// Creates the parent directory if it doesn't exist and opens the
    /// file in append mode.
    pub fn new(path: &Path) -> Result<Self, GateError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                debug!(path = %parent.display(), "Creating audit log directory");
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        debug!(path = %path.display(), "Audit logger initialized");

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Log an audit entry.
    ///
    /// Serializes the entry to JSON, writes it as a single line, and
    /// syncs the file for durability.
    pub fn log(&self, entry: &AuditEntry) -> Result<(), GateError> {
        let json = serde_json::to_string(entry)?;

        let mut file = self.file.lock().map_err(|e| {
            GateError::Io(std::io::Error::other(format!(
                "Failed to acquire audit log lock: {e}"
            )))
        })?;

        writeln!(file, "{}", json)?;

        if let Err(e) = file.sync_data() {
            warn!(error = %e, "Failed to sync audit log");
        }

        debug!(
            record_id = %entry.record_id,
            cookie_name = %entry.cookie_name,
            "Audit entry logged"
        );

        Ok(())
    }

    /// Get the path to the audit log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
