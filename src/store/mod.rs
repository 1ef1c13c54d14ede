//! Installed version record.
//!
//! The record is read and written through two named procedures, created by
//! the stored procedures script: a read view returning the current
//! `(Major, Minor, Build)` row and a write view whose insert trigger appends
//! a new row. Which row is current is decided by the read view, not here.

use crate::install::InstallerError;
use crate::version::Version;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use tracing::debug;

/// Default name of the procedure returning the current version.
pub const READ_PROCEDURE: &str = "subtext_VersionGetCurrent";

/// Default name of the procedure appending a version.
pub const WRITE_PROCEDURE: &str = "subtext_VersionAdd";

/// Reads and appends the installed version.
#[derive(Debug, Clone)]
pub struct VersionStore {
    read_procedure: String,
    write_procedure: String,
}

impl VersionStore {
    /// Create a store using the default procedure names.
    pub fn new() -> Self {
        Self::with_procedures(READ_PROCEDURE, WRITE_PROCEDURE)
    }

    /// Create a store using custom procedure names.
    pub fn with_procedures(read: impl Into<String>, write: impl Into<String>) -> Self {
        Self {
            read_procedure: read.into(),
            write_procedure: write.into(),
        }
    }

    /// Get the installed version.
    ///
    /// Returns `None` when no version row exists, and also when the read
    /// procedure itself is missing, which is the state of a database that
    /// was never installed.
    pub fn current_version(&self, conn: &Connection) -> Result<Option<Version>, InstallerError> {
        let sql = format!(
            "SELECT Major, Minor, Build FROM \"{}\"",
            self.read_procedure
        );

        let row = conn
            .query_row(&sql, [], |row| {
                Ok(Version::new(row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional();

        match row {
            Ok(version) => Ok(version),
            Err(e) if self.is_missing_read_procedure(&e) => {
                debug!(procedure = %self.read_procedure, "Version procedure not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append `version` as the installed version, within `tx`.
    pub fn update_version(&self, tx: &Transaction<'_>, version: &Version) -> Result<(), InstallerError> {
        let sql = format!(
            "INSERT INTO \"{}\" (Major, Minor, Build) VALUES (?1, ?2, ?3)",
            self.write_procedure
        );
        tx.execute(&sql, params![version.major, version.minor, version.build])?;
        debug!(version = %version, "Recorded installation version");
        Ok(())
    }

    fn is_missing_read_procedure(&self, error: &rusqlite::Error) -> bool {
        match error {
            rusqlite::Error::SqliteFailure(e, Some(message)) if e.code == ErrorCode::Unknown => {
                let expected = format!("no such table: {}", self.read_procedure);
                message.eq_ignore_ascii_case(&expected)
            }
            _ => false,
        }
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new()
    }
}
